/// Action directive parsed from controller model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `DATA_QUERY(<argument>)`
    DataQuery(String),
    /// `WEB_SEARCH(<argument>)`
    WebSearch(String),
    /// `FINAL`: enough has been gathered.
    Final,
}

#[derive(Clone, Copy)]
enum Kind {
    Data,
    Web,
}

const TOOL_PATTERNS: &[(&str, Kind)] = &[("DATA_QUERY(", Kind::Data), ("WEB_SEARCH(", Kind::Web)];

impl Directive {
    /// Parse the earliest directive in `input`. Later directives are ignored
    /// so a model that lists several steps still yields exactly one action.
    /// `FINAL` counts only on a line of its own; mentions inside prose do not.
    pub fn parse(input: &str) -> Option<Self> {
        let tool = TOOL_PATTERNS
            .iter()
            .filter_map(|(pat, kind)| input.find(pat).map(|i| (i, pat.len(), *kind)))
            .min_by_key(|(i, _, _)| *i);
        let final_at = final_line_offset(input);

        match (tool, final_at) {
            (Some((idx, _, _)), Some(f)) if f < idx => Some(Directive::Final),
            (Some((idx, pat_len, kind)), _) => {
                let argument = extract_argument(&input[idx + pat_len..]);
                Some(match kind {
                    Kind::Data => Directive::DataQuery(argument),
                    Kind::Web => Directive::WebSearch(argument),
                })
            }
            (None, Some(_)) => Some(Directive::Final),
            (None, None) => None,
        }
    }
}

/// Byte offset of the first line that is exactly `FINAL` (or `FINAL()`),
/// ignoring surrounding whitespace and markdown emphasis.
fn final_line_offset(input: &str) -> Option<usize> {
    let mut offset = 0;
    for line in input.split_inclusive('\n') {
        let token = line.trim().trim_matches(|c: char| c == '`' || c == '*').trim();
        if token == "FINAL" || token == "FINAL()" {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Argument up to the matching close paren. Unclosed: rest of the line.
fn extract_argument(after: &str) -> String {
    let mut depth = 1i32;
    let mut end = None;

    for (i, ch) in after.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let content = match end {
        Some(e) => &after[..e],
        None => after.lines().next().unwrap_or(""),
    };

    let trimmed = content.trim();
    let unquoted = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    unquoted.trim().to_string()
}
