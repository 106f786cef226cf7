//! Answering the questions a learning `Session` asks.

use crate::categorize::session::{Resolution, Session, Step};
use crate::Result;
use anyhow::{bail, Context};
use std::io::{BufRead, Write};

/// An answer to a category question.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CategoryAnswer {
    /// A category to remember for the merchant.
    Chosen(String),
    /// A label for this run only. Nothing is learned from it.
    Provisional(String),
}

impl CategoryAnswer {
    pub fn label(&self) -> &str {
        match self {
            CategoryAnswer::Chosen(label) | CategoryAnswer::Provisional(label) => label,
        }
    }
}

/// Supplies answers to a `Session`.
pub trait Prompter {
    /// Asks for the canonical merchant of `raw`. A blank answer accepts `suggestion`.
    fn canonical(&mut self, raw: &str, suggestion: Option<&str>) -> Result<String>;

    /// Asks for the category of `canonical`, given the known categories and their groups.
    fn category(
        &mut self,
        canonical: &str,
        known: &[(String, Option<String>)],
    ) -> Result<CategoryAnswer>;

    /// Asks which group `category` belongs to. A blank answer chooses `default_group`.
    fn group(&mut self, category: &str, groups: &[String], default_group: &str) -> Result<String>;
}

/// Drives `session` through `description`, asking `prompter` whenever a decision is needed.
/// Returns `None` for a blank description.
pub fn resolve(
    session: &mut Session<'_>,
    description: &str,
    prompter: &mut dyn Prompter,
) -> Result<Option<Resolution>> {
    let mut next = session.step(description);
    loop {
        let step = match next {
            None => return Ok(None),
            Some(step) => step,
        };
        next = match step {
            Step::Resolved(resolution) => return Ok(Some(resolution)),
            Step::NeedsCanonical { raw, suggestion } => {
                let answer = prompter.canonical(&raw, suggestion.as_deref())?;
                session.answer_canonical(&answer)
            }
            Step::NeedsCategory { canonical } => {
                let answer = prompter.category(&canonical, &session.categories())?;
                if answer.label().trim().is_empty() {
                    bail!("No category was given for '{canonical}'");
                }
                match answer {
                    CategoryAnswer::Chosen(category) => session.answer_category(&category),
                    CategoryAnswer::Provisional(label) => {
                        session.answer_category_provisionally(&label)
                    }
                }
            }
            Step::NeedsGroup { category } => {
                let default_group = session.default_group().to_string();
                let answer = prompter.group(&category, &session.groups(), &default_group)?;
                session.answer_group(&answer)
            }
        };
    }
}

/// Answers without asking anyone: suggestions are accepted and unknown merchants are labelled
/// `fallback_category` for this run only, so a later interactive session still asks about them.
#[derive(Debug, Clone)]
pub struct BatchPrompter {
    fallback_category: String,
}

impl BatchPrompter {
    pub fn new(fallback_category: impl Into<String>) -> Self {
        Self {
            fallback_category: fallback_category.into(),
        }
    }
}

impl Prompter for BatchPrompter {
    fn canonical(&mut self, _raw: &str, _suggestion: Option<&str>) -> Result<String> {
        Ok(String::new())
    }

    fn category(
        &mut self,
        _canonical: &str,
        _known: &[(String, Option<String>)],
    ) -> Result<CategoryAnswer> {
        Ok(CategoryAnswer::Provisional(self.fallback_category.clone()))
    }

    fn group(&mut self, _category: &str, _groups: &[String], _default_group: &str) -> Result<String> {
        Ok(String::new())
    }
}

/// Asks questions on an output stream and reads answers, one per line, from an input stream.
/// The end of the input is an error, which abandons the session.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<Box<dyn BufRead>, Box<dyn Write>> {
    /// A prompter on standard input and standard output.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}").context("Unable to write prompt")?;
        self.output.flush().context("Unable to write prompt")?;
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("Unable to read answer")?;
        if n == 0 {
            bail!("Input ended before the session was complete, nothing was saved");
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}").context("Unable to write to the console")
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn canonical(&mut self, raw: &str, suggestion: Option<&str>) -> Result<String> {
        self.say("")?;
        self.say(&format!("Raw merchant: {raw}"))?;
        match suggestion {
            Some(s) => self.ask(&format!("Canonical merchant name [{s}]: ")),
            None => self.ask("Canonical merchant name (leave blank to use raw): "),
        }
    }

    fn category(
        &mut self,
        canonical: &str,
        known: &[(String, Option<String>)],
    ) -> Result<CategoryAnswer> {
        self.say("")?;
        self.say(&format!("Assign category for merchant: {canonical}"))?;
        if known.is_empty() {
            self.say("No categories defined yet.")?;
        } else {
            self.say("Existing categories:")?;
            for (ix, (category, group)) in known.iter().enumerate() {
                let group = group.as_deref().unwrap_or("(no group)");
                self.say(&format!("  {:2}. {category} [{group}]", ix + 1))?;
            }
        }
        loop {
            let answer = self.ask("Category name (existing or new): ")?;
            if !answer.is_empty() {
                return Ok(CategoryAnswer::Chosen(answer));
            }
            self.say("Please enter a category name (or Ctrl+C to abort).")?;
        }
    }

    fn group(&mut self, category: &str, groups: &[String], default_group: &str) -> Result<String> {
        self.say("")?;
        self.say(&format!("Choose group for category '{category}':"))?;
        if groups.is_empty() {
            self.say("No groups defined yet.")?;
        }
        for (ix, group) in groups.iter().enumerate() {
            self.say(&format!("  {:2}. {group}", ix + 1))?;
        }
        self.ask(&format!("Group name (existing or new) [{default_group}]: "))
    }
}
