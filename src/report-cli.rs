//! A small CLI tool for offline reporting on a form's responses.
//! It reads the JSON dump served by the API and reuses the server's own
//! aggregation and export code, so its output matches the live endpoints.

use std::fs::File;
use std::io::{BufReader, Write};

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use feedback_backend::{
    error::Error as BackendError,
    model::{
        api::{report::SummaryDescription, response::FormResponses},
        db::{form::Form, response::Response},
        report::FormReport,
    },
};

const PROGRAM_NAME: &str = "report-cli";

const ABOUT_TEXT: &str = "Summarise or export the responses to a feedback form.

EXIT CODES:
     0: Success.
     1: The dump could not be read, or the output could not be written.
     2: Ran successfully, but there were no responses to export.";

const SUMMARY: &str = "summary";
const EXPORT: &str = "export";

const DUMP_PATH: &str = "DUMP_PATH";
const OUTPUT: &str = "OUTPUT";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of a form,\n\
as returned by `GET /forms/<form_id>/responses`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    let dump_path = Arg::new(DUMP_PATH)
        .help(DUMP_PATH_HELP)
        .action(ArgAction::Set)
        .required(true);

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new(SUMMARY)
                .about("Print the option counts and percentages of every choice question")
                .arg(dump_path.clone()),
        )
        .subcommand(
            Command::new(EXPORT)
                .about("Write one CSV row per response")
                .arg(dump_path)
                .arg(
                    Arg::new(OUTPUT)
                        .short('o')
                        .long("output")
                        .help("File to write the CSV to; defaults to standard output")
                        .action(ArgAction::Set),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// The form has no responses to export.
    Empty(String),
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::EmptyResult(msg) => Self::Empty(msg),
            other => Self::Format(other.to_string()),
        }
    }
}

/// Load a dump, ordering its responses by submission time.
fn load(path: &str) -> Result<FormReport, Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: FormResponses =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    let form = Form::from(dump.form);
    let mut responses = dump
        .responses
        .into_iter()
        .map(Response::from)
        .collect::<Vec<_>>();
    // Stable, so ties keep their order in the dump.
    responses.sort_by_key(|r| r.submitted_at);

    Ok(FormReport { form, responses })
}

/// Render the summary as lines of text.
fn summary_lines(report: &FormReport) -> Vec<String> {
    let summary = SummaryDescription::from(report);
    let mut lines = vec![format!(
        "{} ({} response{})",
        summary.title,
        summary.total_responses,
        if summary.total_responses != 1 { "s" } else { "" }
    )];
    for question in summary.questions {
        lines.push(format!(
            "{} ({} vote{})",
            question.prompt,
            question.total,
            if question.total != 1 { "s" } else { "" }
        ));
        for option in question.options {
            lines.push(format!(
                "  {}: {} ({}%)",
                option.option, option.count, option.percentage
            ));
        }
    }
    lines
}

/// Write the CSV export to `output`, or standard output. Returns the number of rows.
fn export(report: &FormReport, output: Option<&str>) -> Result<usize, Error> {
    let csv = report.export_csv()?;
    match output {
        Some(path) => File::create(path)
            .and_then(|mut file| file.write_all(&csv))
            .map_err(|e| Error::IO(e.to_string()))?,
        None => std::io::stdout()
            .write_all(&csv)
            .map_err(|e| Error::IO(e.to_string()))?,
    }
    Ok(report.responses.len())
}

/// Run the chosen subcommand, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let result = match args.subcommand() {
        Some((SUMMARY, sub_args)) => {
            // Required argument is guaranteed to be present.
            let path: &String = sub_args.get_one(DUMP_PATH).unwrap();
            load(path).map(|report| {
                for line in summary_lines(&report) {
                    println!("{line}");
                }
            })
        }
        Some((EXPORT, sub_args)) => {
            let path: &String = sub_args.get_one(DUMP_PATH).unwrap();
            let output = sub_args.get_one::<String>(OUTPUT).map(String::as_str);
            load(path)
                .and_then(|report| export(&report, output))
                .map(|rows| {
                    if let Some(output) = output {
                        println!("Wrote {rows} row{} to {output}", if rows != 1 { "s" } else { "" });
                    }
                })
        }
        // `subcommand_required` rules this out.
        _ => unreachable!(),
    };

    match result {
        Ok(()) => 0,
        Err(Error::IO(msg)) => {
            eprintln!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            eprintln!("Invalid dump: {msg}");
            1
        }
        Err(Error::Empty(msg)) => {
            eprintln!("{msg}");
            2
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
