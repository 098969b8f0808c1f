//! # Terminal Wizard
//!
//! Drives a [`ScreeningSession`] from line-based input. Generic over the
//! reader and writer so the whole dialogue can be exercised in tests.

use crate::error::AppError;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use talkstart_core::{
    AgeGroupId, FeedbackRating, Phase, ScreeningError, ScreeningReport, ScreeningSession,
};

const WELCOME: &str = "\
Speech Development Screening
============================
A quick check of common speech and language milestones for toddlers.
This is not a diagnosis. If you are worried, talk to your pediatrician.

Sources: American Speech-Language-Hearing Association (ASHA); Speech Pathology Australia.
";

/// Line-oriented dialogue over a screening session.
pub struct Wizard<R, W> {
    input: R,
    output: W,
    save_path: Option<PathBuf>,
    verbose: bool,
}

impl<R: BufRead, W: Write> Wizard<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            save_path: None,
            verbose: false,
        }
    }

    /// Where "save" writes the JSON report. Without a path the report is printed.
    #[must_use]
    pub fn with_save_path(mut self, path: Option<PathBuf>) -> Self {
        self.save_path = path;
        self
    }

    /// Show milestone categories next to each question.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run until the user quits or input ends.
    ///
    /// `preset` skips the age-group prompt on the first pass. Returns the
    /// last report shown, if any.
    pub fn run(
        &mut self,
        session: &mut ScreeningSession,
        preset: Option<&AgeGroupId>,
    ) -> Result<Option<ScreeningReport>, AppError> {
        let mut preset = preset.cloned();
        let mut last_report = None;
        let mut results_shown = false;

        loop {
            match session.phase() {
                Phase::Welcome => {
                    writeln!(self.output, "{}", WELCOME)?;
                    match self.prompt("Press Enter to start, or q to quit: ")? {
                        Some(line) if !is_quit(&line) => session.begin()?,
                        _ => return Ok(last_report),
                    }
                }

                Phase::AgeSelection => {
                    if let Some(id) = preset.take() {
                        session.choose_age_group(&id)?;
                        continue;
                    }
                    self.print_age_groups(session)?;
                    let Some(line) = self.prompt("Choose an age group, b to go back, q to quit: ")?
                    else {
                        return Ok(last_report);
                    };
                    if is_quit(&line) {
                        return Ok(last_report);
                    }
                    if line.eq_ignore_ascii_case("b") {
                        session.back()?;
                        continue;
                    }

                    let id = resolve_group(session, &line);
                    match session.choose_age_group(&id) {
                        Ok(()) => {}
                        Err(ScreeningError::InvalidSelection(_)) => {
                            writeln!(self.output, "Unknown age group '{}'.", line)?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }

                Phase::Screening => {
                    let (Some(group), Some(milestone)) =
                        (session.selected_age_group(), session.current_milestone())
                    else {
                        return Err(AppError::InvalidInput(
                            "Screening without a current question".to_string(),
                        ));
                    };
                    let id = milestone.id.clone();

                    writeln!(self.output)?;
                    writeln!(
                        self.output,
                        "Question {} of {} · {}",
                        session.question_index().saturating_add(1),
                        group.total(),
                        group.name
                    )?;
                    if self.verbose {
                        writeln!(self.output, "[{}]", milestone.category)?;
                    }
                    writeln!(self.output, "{}", milestone.question)?;

                    let Some(line) =
                        self.prompt("Does your child currently do this? [y]es / [n]ot yet: ")?
                    else {
                        return Ok(last_report);
                    };
                    if is_quit(&line) {
                        return Ok(last_report);
                    }
                    match parse_yes_no(&line) {
                        Some(value) => {
                            session.answer(&id, value)?;
                        }
                        None => writeln!(self.output, "Please answer y or n.")?,
                    }
                }

                Phase::Results => {
                    if !results_shown {
                        if let Some(report) = session.report() {
                            writeln!(self.output)?;
                            writeln!(self.output, "{}", render_report(&report))?;
                            last_report = Some(report);
                        }
                        results_shown = true;
                    }

                    let Some(line) =
                        self.prompt("[s]ave results, [f]eedback, [r]estart, [q]uit: ")?
                    else {
                        return Ok(last_report);
                    };
                    match line.to_ascii_lowercase().as_str() {
                        "s" | "save" => self.save(session)?,
                        "f" | "feedback" => self.feedback(session)?,
                        "r" | "restart" => {
                            session.restart()?;
                            results_shown = false;
                        }
                        "q" | "quit" | "" => return Ok(last_report),
                        _ => writeln!(self.output, "Unknown choice '{}'.", line)?,
                    }
                }
            }
        }
    }

    fn print_age_groups(&mut self, session: &ScreeningSession) -> Result<(), AppError> {
        writeln!(self.output, "Select your child's age:")?;
        for (i, group) in session.catalog().groups().iter().enumerate() {
            writeln!(
                self.output,
                "  {}. {} {} ({} questions)",
                i.saturating_add(1),
                group.icon,
                group.name,
                group.total()
            )?;
        }
        Ok(())
    }

    fn save(&mut self, session: &ScreeningSession) -> Result<(), AppError> {
        let report = session.save_results()?;
        match &self.save_path {
            Some(path) => {
                super::write_report(path, &report)?;
                writeln!(self.output, "Results saved to {}", path.display())?;
            }
            None => {
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| AppError::Io(e.to_string()))?;
                writeln!(self.output, "{}", json)?;
            }
        }
        Ok(())
    }

    fn feedback(&mut self, session: &mut ScreeningSession) -> Result<(), AppError> {
        if session.feedback().is_some() {
            writeln!(self.output, "Thank you, your feedback is already recorded.")?;
            return Ok(());
        }

        let rating = loop {
            let Some(line) = self.prompt("Was this screening helpful? [y/n]: ")? else {
                return Ok(());
            };
            match parse_yes_no(&line) {
                Some(true) => break FeedbackRating::Helpful,
                Some(false) => break FeedbackRating::NotHelpful,
                None => writeln!(self.output, "Please answer y or n.")?,
            }
        };
        let comment = self
            .prompt("Anything we could improve? (optional): ")?
            .unwrap_or_default();

        match session.submit_feedback(rating, comment) {
            Ok(()) => writeln!(self.output, "Thank you for your feedback!")?,
            Err(ScreeningError::InvalidFeedback(msg)) => writeln!(self.output, "{}", msg)?,
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Print a prompt and read one trimmed line. `None` at end of input.
    fn prompt(&mut self, text: &str) -> Result<Option<String>, AppError> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Run a whole pass without prompts and return the results report.
///
/// Building the report is not a save; callers export with
/// [`ScreeningSession::save_results`] when the user asked for it.
pub fn run_scripted(
    session: &mut ScreeningSession,
    group: &AgeGroupId,
    answers: &[bool],
) -> Result<ScreeningReport, AppError> {
    session.begin()?;
    session.choose_age_group(group)?;

    let total = session.selected_age_group().map_or(0, |g| g.total());
    if answers.len() != total {
        return Err(AppError::InvalidInput(format!(
            "Age group {} has {} questions, got {} answers",
            group,
            total,
            answers.len()
        )));
    }

    for value in answers {
        let id = session
            .current_milestone()
            .map(|m| m.id.clone())
            .ok_or_else(|| AppError::InvalidInput("No current question".to_string()))?;
        session.answer(&id, *value)?;
    }

    session
        .report()
        .ok_or_else(|| AppError::InvalidInput("Screening did not reach results".to_string()))
}

/// Parse "yyny", "y,n,y,y" or "yes no yes yes".
pub fn parse_answers(s: &str) -> Result<Vec<bool>, AppError> {
    let tokens: Vec<String> = if s.contains(',') || s.contains(char::is_whitespace) {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        s.chars().map(String::from).collect()
    };

    if tokens.is_empty() {
        return Err(AppError::InvalidInput("No answers given".to_string()));
    }

    tokens
        .iter()
        .map(|t| {
            parse_yes_no(t)
                .ok_or_else(|| AppError::InvalidInput(format!("Not a yes/no answer: '{}'", t)))
        })
        .collect()
}

/// Text rendering of a report, as shown on the results screen.
pub fn render_report(report: &ScreeningReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", report.title));
    out.push_str(&format!("{}\n\n", report.message));
    out.push_str(&format!(
        "{}/{} milestones achieved ({}%) · {}\n\n",
        report.score.achieved, report.score.total, report.score.percentage, report.age_group_name
    ));
    out.push_str("What's Next?\n");
    for item in &report.guidance {
        out.push_str(&format!("  • {}\n", item));
    }
    out
}

fn parse_yes_no(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "not yet" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn is_quit(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "q" | "quit" | "exit")
}

/// Accept a 1-based list number or an age group id.
fn resolve_group(session: &ScreeningSession, choice: &str) -> AgeGroupId {
    choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| session.catalog().group_at(i))
        .map(|g| g.id.clone())
        .unwrap_or_else(|| AgeGroupId::new(choice))
}

// =============================================================================
// TESTS
// =============================================================================
