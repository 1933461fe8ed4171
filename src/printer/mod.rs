//! Console output: run header, scheduling lines and per-task summaries.

use std::time::Duration;

use owo_colors::OwoColorize;

use crate::template::Invocation;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrinter {
    pub color: bool,
    pub quiet: bool,
}

impl ConsolePrinter {
    pub fn new(color: bool) -> Self {
        Self { color, quiet: false }
    }

    /// A printer that prints nothing.
    pub fn silent() -> Self {
        Self { color: false, quiet: true }
    }

    pub fn header(&self, template: &[String], args: &[String], timeout: Option<Duration>, threads: usize) {
        if self.quiet {
            return;
        }
        println!("Task: {:?}", template);
        println!("Args: {:?}", args);
        println!("Timeout: {}", format_timeout(timeout));
        println!("Threads: {}", threads);
    }

    pub fn scheduling(&self, invocation: &Invocation) {
        if self.quiet {
            return;
        }
        println!("Scheduling: {}", invocation);
    }

    pub fn completed(
        &self,
        invocation: &Invocation,
        duration: Duration,
        timeout: Option<Duration>,
        exit_code: Option<i32>,
        stdout: &str,
        stderr: &str,
    ) {
        if self.quiet {
            return;
        }
        println!();
        let exit = match exit_code {
            Some(0) => String::new(),
            Some(code) => format!(" [exit {}]", code),
            None => " [killed by signal]".to_string(),
        };
        let line = format!(
            "{} finished within {:.3}s (t/o: {}){}",
            invocation.quoted(),
            duration.as_secs_f64(),
            format_timeout(timeout),
            exit
        );
        self.line(&line, "green");

        if !stdout.is_empty() {
            print_block("stdout", stdout);
        }
        if !stdout.is_empty() && !stderr.is_empty() {
            println!();
        }
        if !stderr.is_empty() {
            print_block("stderr", stderr);
        }
    }

    pub fn timed_out(&self, invocation: &Invocation, timeout: Option<Duration>) {
        if self.quiet {
            return;
        }
        println!();
        self.line(
            &format!("{} timed out after {}", invocation.quoted(), format_timeout(timeout)),
            "yellow",
        );
    }

    pub fn failed(&self, invocation: &Invocation, error: &str) {
        if self.quiet {
            return;
        }
        println!();
        self.line(&format!("{} failed to start: {}", invocation.quoted(), error), "red");
    }

    fn line(&self, text: &str, color: &str) {
        if !self.color {
            println!("{}", text);
            return;
        }
        match color {
            "green" => println!("{}", text.green()),
            "yellow" => println!("{}", text.yellow()),
            "red" => println!("{}", text.red()),
            _ => println!("{}", text),
        }
    }
}

fn print_block(name: &str, content: &str) {
    let start = format!("-- {} start ", name);
    let end = format!("-- {} end ", name);
    println!("{}{}", start, "-".repeat(48usize.saturating_sub(start.len())));
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    println!("{}{}", end, "-".repeat(48usize.saturating_sub(end.len())));
}

pub fn format_timeout(timeout: Option<Duration>) -> String {
    match timeout {
        Some(t) => format!("{}s", t.as_secs()),
        None => "-".to_string(),
    }
}
