use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::Path;
use walkdir::WalkDir;

// Directories holding this crate's Rust sources. Nothing else is scanned.
const SOURCE_DIRS: [&str; 6] = ["shared", "transform", "layout", "rows", "tests", "benches"];

const FORBIDDEN_WORDS: &str =
    "FIXED|CORRECTED|FIXES|FIX|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE";

// One source policy: a line matcher plus a filter that decides whether a
// matched line really breaks the policy.
struct Rule {
    title: &'static str,
    pattern: String,
    hint: &'static str,
    violates: fn(&str) -> bool,
}

// Collects the offending lines of one file.
struct Findings {
    violates: fn(&str) -> bool,
    lines: Vec<String>,
}

impl Sink for Findings {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if (self.violates)(line_text) {
            self.lines.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with("//") || line.contains("/*")
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

// Text of the comment on `line`, without its opening marker.
fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    let open = line.find("/*")?;
    let body = &line[open + 2..];
    Some(body.find("*/").map_or(body, |close| &body[..close]).trim())
}

// True when an underscore-prefixed name on `line` sits in code rather than in
// a comment or a string literal.
fn underscore_in_code(line: &str) -> bool {
    if is_comment_line(line) {
        return false;
    }
    let quoted = line
        .split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'));
    !quoted
}

fn all_caps_comment(line: &str) -> bool {
    let Some(text) = comment_text(line) else {
        return false;
    };
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(char::is_uppercase)
}

fn rules() -> Vec<Rule> {
    vec![
        Rule {
            title: "underscore-prefixed names",
            pattern: r"\b(_[a-zA-Z0-9_]+)\b".to_string(),
            hint: "Either use the binding under its real name or remove it completely.",
            violates: underscore_in_code,
        },
        Rule {
            title: "forbidden comment words",
            pattern: format!(r"(//|/\*).*(?:{FORBIDDEN_WORDS})"),
            hint: "Comments describe the code as it is, not its history. Remove them.",
            violates: |_| true,
        },
        Rule {
            title: "'**' in non-doc comments",
            pattern: r"(//|/\*).*\*\*".to_string(),
            hint: "Emphasis markup is only allowed in doc comments.",
            violates: |line| !is_doc_comment(line),
        },
        Rule {
            title: "comments written entirely in uppercase",
            pattern: r"(//|/\*).*".to_string(),
            hint: "Rewrite the comment in sentence case or delete it.",
            violates: all_caps_comment,
        },
        Rule {
            title: "#[allow(dead_code)] attributes",
            pattern: r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]".to_string(),
            hint: "Either use the code or remove it completely.",
            violates: |_| true,
        },
    ]
}

fn check_file(rule: &Rule, matcher: &RegexMatcher, searcher: &mut Searcher, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut findings = Findings {
        violates: rule.violates,
        lines: Vec::new(),
    };
    searcher.search_path(matcher, path, &mut findings)?;
    if findings.lines.is_empty() {
        return Ok(());
    }
    let mut message = format!(
        "\n❌ ERROR: Found {} {} in {}:\n",
        findings.lines.len(),
        rule.title,
        path.display()
    );
    for line in &findings.lines {
        message.push_str(&format!("   {line}\n"));
    }
    message.push_str(&format!("\n⚠️ {} are STRICTLY FORBIDDEN in this project.\n", rule.title));
    message.push_str(&format!("   {}\n", rule.hint));
    Err(message.into())
}

fn check_sources() -> Result<(), Box<dyn Error>> {
    let rules = rules();
    let matchers = rules
        .iter()
        .map(|rule| RegexMatcher::new_line_matcher(&rule.pattern))
        .collect::<Result<Vec<_>, _>>()?;
    let mut searcher = Searcher::new();

    for dir in SOURCE_DIRS {
        for entry in WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        {
            for (rule, matcher) in rules.iter().zip(&matchers) {
                check_file(rule, matcher, &mut searcher, entry.path())?;
            }
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    if let Err(e) = check_sources() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
