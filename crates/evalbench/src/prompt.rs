//! Interactive collection of parameters not given on the command line.

use std::io::{BufRead, Write};

use libevalbench_core::{BenchError, Result, ServerCommand};

/// Ask one question and read one trimmed line. `None` on EOF (Ctrl+D or a
/// closed stdin), which callers treat as "accept the default".
fn ask(question: &str) -> Result<Option<String>> {
    print!("{question}");
    std::io::stdout().flush()?;

    let mut input = String::new();
    if std::io::stdin().lock().read_line(&mut input)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Resolve a selection against the model list: a list number, an exact
/// name, or empty for the first entry.
fn parse_selection(input: &str, models: &[String]) -> Option<String> {
    if input.is_empty() {
        return models.first().cloned();
    }
    if let Ok(number) = input.parse::<usize>() {
        if (1..=models.len()).contains(&number) {
            return Some(models[number - 1].clone());
        }
    }
    // A name the server does not list is still accepted verbatim; the run
    // itself will surface the failure.
    Some(input.to_string())
}

/// Pick a model interactively from the server's `list` output
pub fn model(server: &ServerCommand) -> Result<String> {
    let models = server.list_models().unwrap_or_default();

    if models.is_empty() {
        println!("No local models reported by '{} list'.", server.command());
    } else {
        println!("Available models:");
        for (i, model) in models.iter().enumerate() {
            println!("  {}) {}", i + 1, model);
        }
    }

    let question = match models.first() {
        Some(first) => format!("Model [{}]: ", first),
        None => "Model: ".to_string(),
    };

    loop {
        let answer = match ask(&question)? {
            Some(answer) => answer,
            None => {
                return models.first().cloned().ok_or_else(|| {
                    BenchError::InvalidArgs(
                        "no model given and none available to default to".to_string(),
                    )
                })
            }
        };
        if let Some(selected) = parse_selection(&answer, &models) {
            return Ok(selected);
        }
        println!("Pick a listed number or enter a model name.");
    }
}

/// Prompt for a run count, falling back to the default on empty input/EOF
pub fn count(label: &str, default: usize) -> Result<usize> {
    loop {
        let answer = match ask(&format!("{label} [{default}]: "))? {
            Some(answer) => answer,
            None => return Ok(default),
        };
        if answer.is_empty() {
            return Ok(default);
        }
        match answer.parse::<usize>() {
            Ok(value) if value > 0 => return Ok(value),
            _ => println!("Enter a positive number."),
        }
    }
}
