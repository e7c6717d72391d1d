use std::io::{BufRead, Write};

use log::{debug, warn};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Errors from reading user input.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("input closed before an answer was given")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line editor error: {0}")]
    Editor(#[from] ReadlineError),
}

/// Errors from the column selector.
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("'{token}' is not an integer; input only the integer values that correspond to the column(s) you wish to merge on")]
    InvalidIndex { token: String },

    #[error("index {index} is out of range; choose a value between 0 and {}", .len.saturating_sub(1))]
    OutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl SelectError {
    /// Whether the user can fix this by answering again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SelectError::Prompt(_))
    }
}

// ---------------------------------------------------------------------------
// Console – where prompts go and answers come from
// ---------------------------------------------------------------------------

pub trait Console {
    /// Print a line of text for the user.
    fn say(&mut self, text: &str) -> Result<(), PromptError>;

    /// Show `prompt` and read one line of input, without the line ending.
    fn ask(&mut self, prompt: &str) -> Result<String, PromptError>;
}

/// Terminal console with line editing and history.
pub struct Interactive {
    editor: DefaultEditor,
}

impl Interactive {
    pub fn new() -> Result<Self, PromptError> {
        Ok(Interactive {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Console for Interactive {
    fn say(&mut self, text: &str) -> Result<(), PromptError> {
        println!("{text}");
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String, PromptError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                Ok(line)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(PromptError::Closed),
            Err(err) => Err(err.into()),
        }
    }
}

/// Console over plain reader/writer pairs: piped stdin, or canned input in tests.
pub struct Scripted<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Scripted<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Scripted { input, output }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Console for Scripted<R, W> {
    fn say(&mut self, text: &str) -> Result<(), PromptError> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<String, PromptError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::Closed);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        writeln!(self.output)?;
        Ok(line)
    }
}

// ---------------------------------------------------------------------------
// Column selector
// ---------------------------------------------------------------------------

/// Turn `"2, 0"` into the named columns, in the order given.
pub fn parse_indices(input: &str, header: &[String]) -> Result<Vec<String>, SelectError> {
    input
        .split(',')
        .map(|token| {
            let token = token.trim();
            let index: usize = token.parse().map_err(|_| SelectError::InvalidIndex {
                token: token.to_string(),
            })?;
            header
                .get(index)
                .cloned()
                .ok_or(SelectError::OutOfRange {
                    index,
                    len: header.len(),
                })
        })
        .collect()
}

/// List the columns of `header` with their indices and read a selection.
pub fn choose_columns(
    console: &mut dyn Console,
    table: &str,
    header: &[String],
) -> Result<Vec<String>, SelectError> {
    console.say(&format!(
        "\nChoose the indices to merge {table} on. The chosen columns must hold the same \
         information in peaklist1, peaklist2 and the RNA-seq file.\n\n\
         For multiple columns, separate using a comma:\n"
    ))?;
    for (i, name) in header.iter().enumerate() {
        console.say(&format!("{i}\t{name}"))?;
    }
    let answer = console.ask("Indices: ")?;
    let columns = parse_indices(&answer, header)?;
    debug!("{table}: selected {columns:?}");
    Ok(columns)
}

/// [`choose_columns`], asking once more if the first answer is unusable.
pub fn choose_columns_with_retry(
    console: &mut dyn Console,
    table: &str,
    header: &[String],
) -> Result<Vec<String>, SelectError> {
    match choose_columns(console, table, header) {
        Err(err) if err.is_retryable() => {
            warn!("{table}: {err}");
            console.say(&format!("{err}. Please choose again below."))?;
            choose_columns(console, table, header)
        }
        other => other,
    }
}

/// Ask a free-text question; an empty answer means `default`.
pub fn ask_or_default(
    console: &mut dyn Console,
    question: &str,
    default: &str,
) -> Result<String, PromptError> {
    let answer = console.ask(&format!("{question} [{default}]: "))?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn header() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into()]
    }

    fn scripted(input: &str) -> Scripted<&[u8], Vec<u8>> {
        Scripted::new(input.as_bytes(), Vec::new())
    }

    #[rstest]
    #[case("2,0", vec!["C", "A"])]
    #[case(" 1 , 2 ", vec!["B", "C"])]
    #[case("0", vec!["A"])]
    #[case("1,1", vec!["B", "B"])]
    fn test_parse_keeps_user_order(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(parse_indices(input, &header()).unwrap(), expected);
    }

    #[rstest]
    #[case("a,1")]
    #[case("")]
    #[case("-1")]
    #[case("0;1")]
    fn test_parse_rejects_non_integers(#[case] input: &str) {
        assert!(matches!(
            parse_indices(input, &header()),
            Err(SelectError::InvalidIndex { .. })
        ));
    }

    #[rstest]
    fn test_parse_out_of_range_is_bounded() {
        let err = parse_indices("0,3", &header()).unwrap_err();
        assert!(matches!(err, SelectError::OutOfRange { index: 3, len: 3 }));
        assert!(err.to_string().contains("between 0 and 2"));
    }

    #[rstest]
    fn test_choose_lists_columns_with_indices() {
        let mut console = scripted("1\n");
        let picked = choose_columns(&mut console, "peaklist1", &header()).unwrap();
        assert_eq!(picked, vec!["B"]);
        let shown = String::from_utf8(console.into_output()).unwrap();
        assert!(shown.contains("0\tA\n1\tB\n2\tC\n"));
        assert!(shown.contains("Indices: "));
    }

    #[rstest]
    fn test_retry_once_after_bad_input() {
        let mut console = scripted("x\n2,0\n");
        let picked = choose_columns_with_retry(&mut console, "peaklist1", &header()).unwrap();
        assert_eq!(picked, vec!["C", "A"]);
        let shown = String::from_utf8(console.into_output()).unwrap();
        assert!(shown.contains("Please choose again below."));
    }

    #[rstest]
    fn test_second_failure_is_returned() {
        let mut console = scripted("x\n9\n0\n");
        let err = choose_columns_with_retry(&mut console, "peaklist1", &header()).unwrap_err();
        assert!(matches!(err, SelectError::OutOfRange { index: 9, .. }));
    }

    #[rstest]
    fn test_closed_input_is_not_retried() {
        let mut console = scripted("");
        let err = choose_columns_with_retry(&mut console, "peaklist1", &header()).unwrap_err();
        assert!(matches!(err, SelectError::Prompt(PromptError::Closed)));
    }

    #[rstest]
    #[case("\n", "peaks_DEG")]
    #[case("   \n", "peaks_DEG")]
    #[case("my_run\n", "my_run")]
    #[case("my_run\r\n", "my_run")]
    fn test_ask_or_default(#[case] input: &str, #[case] expected: &str) {
        let mut console = scripted(input);
        let answer =
            ask_or_default(&mut console, "Please specify the output filename", "peaks_DEG").unwrap();
        assert_eq!(answer, expected);
    }
}
