use serde::{Deserialize, Serialize};

/// One option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub label: String,
    pub text: String,
}

/// One question recovered from the quiz generator's free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<QuizOption>,
    /// Label named by the `Answer:` line, absent when there is none
    pub correct: Option<String>,
}

/// Parse result: structured questions plus the raw text block each one
/// came from. The presentation layer renders the raw block and grades
/// against the structured record, so both travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuiz {
    pub raw_blocks: Vec<String>,
    pub questions: Vec<QuizQuestion>,
}

/// Byte length of a `Q<digits>.` question prefix at the start of
/// `line`, if present.
fn question_prefix_len(line: &str) -> Option<usize> {
    let rest = line.strip_prefix('Q')?;
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    rest[digits..].starts_with('.').then_some(1 + digits + 1)
}

/// Turn the quiz generator's numbered-question text into structured
/// records.
///
/// Blocks are split at boundaries preceding a `Q<number>.` line; empty
/// blocks are discarded. Within a block the first line (prefix
/// stripped) is the question, the next up to four lines are candidate
/// options split on their first `.`, and an `Answer:` line anywhere in
/// the block names the correct label. Candidate lines with no `.`
/// separator, and the `Answer:` line itself, are silently dropped from
/// the options. A malformed question still yields a record and never
/// aborts parsing of the rest.
pub fn parse(quiz_text: &str) -> ParsedQuiz {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in quiz_text.lines() {
        if question_prefix_len(line).is_some() {
            blocks.push(vec![line]);
        } else if let Some(current) = blocks.last_mut() {
            current.push(line);
        }
    }

    let mut raw_blocks = Vec::new();
    let mut questions = Vec::new();

    for block in blocks {
        let raw = block.join("\n");
        if raw.trim().is_empty() {
            continue;
        }

        let lines: Vec<&str> = block.iter().map(|line| line.trim()).collect();

        let first = lines.first().copied().unwrap_or_default();
        let question = match question_prefix_len(first) {
            Some(len) => first[len..].trim_start().to_string(),
            None => first.to_string(),
        };

        let options = lines
            .iter()
            .skip(1)
            .take(4)
            .filter(|line| !line.starts_with("Answer:"))
            .filter_map(|line| line.split_once('.'))
            .map(|(label, text)| QuizOption {
                label: label.trim().to_string(),
                text: text.trim().to_string(),
            })
            .collect();

        let correct = lines
            .iter()
            .find(|line| line.starts_with("Answer:"))
            .and_then(|line| line.splitn(2, ':').nth(1))
            .map(|answer| answer.trim().to_string());

        raw_blocks.push(raw);
        questions.push(QuizQuestion {
            question,
            options,
            correct,
        });
    }

    ParsedQuiz {
        raw_blocks,
        questions,
    }
}
