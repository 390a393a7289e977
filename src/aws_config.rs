// AWS config file model
//
// Sections are kept in file order. Lines nobody touched are written back exactly as
// they were read; only keys that are set to a new value are normalised to `key = value`.
use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Get the default AWS config file path
pub fn default_config_file_path() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        Ok(home.join(".aws").join("config"))
    } else {
        Err(Error::ConfigError(
            "Could not determine home directory".to_string(),
        ))
    }
}

/// Section key for a named profile
pub fn profile_section(profile_name: &str) -> String {
    format!("profile {}", profile_name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry {
        key: String,
        value: String,
        /// Original text, dropped once the value changes
        raw: Option<String>,
    },
    Other(String),
}

impl Line {
    fn is_blank(&self) -> bool {
        matches!(self, Line::Other(text) if text.trim().is_empty())
    }

    fn render(&self) -> String {
        match self {
            Line::Entry {
                raw: Some(raw), ..
            } => raw.clone(),
            Line::Entry { key, value, .. } => format!("{} = {}", key, value),
            Line::Other(text) => text.clone(),
        }
    }
}

/// A `[name]` block and everything up to the next header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    /// Comment lines directly above the header
    leading: Vec<String>,
    header: Option<String>,
    lines: Vec<Line>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            leading: Vec::new(),
            header: None,
            lines: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of `key`; the last occurrence wins
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set `key` to `value`, appending the key if the section does not have it yet
    pub fn set(&mut self, key: &str, value: &str) {
        let mut found = false;

        for line in self.lines.iter_mut() {
            if let Line::Entry {
                key: k,
                value: v,
                raw,
            } = line
            {
                if k == key {
                    found = true;
                    if v != value {
                        *v = value.to_string();
                        *raw = None;
                    }
                }
            }
        }

        if !found {
            let pos = self
                .lines
                .iter()
                .rposition(|line| !line.is_blank())
                .map_or(0, |i| i + 1);
            self.lines.insert(
                pos,
                Line::Entry {
                    key: key.to_string(),
                    value: value.to_string(),
                    raw: None,
                },
            );
        }
    }

    fn render_lines(&self) -> Vec<String> {
        let mut out = self.leading.clone();
        out.push(
            self.header
                .clone()
                .unwrap_or_else(|| format!("[{}]", self.name)),
        );
        out.extend(self.lines.iter().map(Line::render));
        trim_trailing_blank(&mut out);
        out
    }
}

/// Where and why parsing stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub line: usize,
    pub reason: String,
}

/// Parsed `~/.aws/config`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsConfigFile {
    /// Comments and blank lines before the first section
    preamble: Vec<Line>,
    sections: Vec<Section>,
}

impl AwsConfigFile {
    /// Load and parse a config file. A file that does not exist yet is empty.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} does not exist, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Self::parse(&content).map_err(|failure| Error::ConfigFileCorrupt {
            path: path.to_path_buf(),
            line: failure.line,
            reason: failure.reason,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, ParseFailure> {
        let mut config = Self::default();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            let fail = |reason: &str| ParseFailure {
                line: line_no,
                reason: reason.to_string(),
            };

            if trimmed.is_empty() || is_comment(trimmed) {
                match config.sections.last_mut() {
                    Some(section) => section.lines.push(Line::Other(line.to_string())),
                    None => config.preamble.push(Line::Other(line.to_string())),
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                // anything after the closing bracket (a comment, usually) is ignored
                let Some(end) = rest.find(']') else {
                    return Err(fail("section header is missing a closing ']'"));
                };
                let name = normalize_name(&rest[..end]);
                if name.is_empty() {
                    return Err(fail("empty section name"));
                }
                if config.has_section(&name) {
                    return Err(fail(&format!("duplicate section [{}]", name)));
                }
                let leading = match config.sections.last_mut() {
                    Some(prev) => take_trailing_comments(&mut prev.lines),
                    None => take_trailing_comments(&mut config.preamble),
                };
                config.sections.push(Section {
                    name,
                    leading,
                    header: Some(line.to_string()),
                    lines: Vec::new(),
                });
                continue;
            }

            let Some(section) = config.sections.last_mut() else {
                return Err(fail("key/value pair before any section header"));
            };

            // Indented lines after a key belong to it (nested s3/api_versions settings)
            let indented = line.starts_with(' ') || line.starts_with('\t');
            let has_entry = section
                .lines
                .iter()
                .any(|l| matches!(l, Line::Entry { .. }));
            if indented && has_entry {
                section.lines.push(Line::Other(line.to_string()));
                continue;
            }

            // configparser accepts both delimiters; the first one on the line splits
            let Some(split) = trimmed.find(|c: char| c == '=' || c == ':') else {
                return Err(fail("expected 'key = value'"));
            };
            let (key, value) = (trimmed[..split].trim(), &trimmed[split + 1..]);
            if key.is_empty() {
                return Err(fail("empty key"));
            }
            section.lines.push(Line::Entry {
                key: key.to_string(),
                value: value.trim().to_string(),
                raw: Some(line.to_string()),
            });
        }

        Ok(config)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        let name = normalize_name(name);
        self.sections().find(|s| s.name == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Append an empty section, or return the existing one
    pub fn add_section(&mut self, name: &str) -> &mut Section {
        let name = normalize_name(name);
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => &mut self.sections[idx],
            None => {
                self.sections.push(Section::new(&name));
                let last = self.sections.len() - 1;
                &mut self.sections[last]
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Remove every section rejected by `keep`, returning the removed names in file order
    pub fn retain_sections<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&Section) -> bool,
    {
        let mut removed = Vec::new();
        self.sections.retain(|section| {
            let kept = keep(section);
            if !kept {
                removed.push(section.name().to_string());
            }
            kept
        });
        removed
    }

    /// Serialise: one blank line between sections, trailing newline
    pub fn render(&self) -> String {
        let mut blocks: Vec<Vec<String>> = Vec::new();

        let mut preamble: Vec<String> = self.preamble.iter().map(Line::render).collect();
        trim_trailing_blank(&mut preamble);
        if !preamble.is_empty() {
            blocks.push(preamble);
        }
        blocks.extend(self.sections.iter().map(Section::render_lines));

        if blocks.is_empty() {
            return String::new();
        }

        let mut out = blocks
            .iter()
            .map(|block| block.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n");
        out.push('\n');
        out
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.render())
    }
}

/// `[profile  foo]` and `[profile foo]` name the same section
fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with(';')
}

/// Detach the comment block that ends `lines`, in original order
fn take_trailing_comments(lines: &mut Vec<Line>) -> Vec<String> {
    let mut taken = Vec::new();
    while let Some(Line::Other(text)) = lines.last() {
        if !is_comment(text.trim()) {
            break;
        }
        taken.push(text.clone());
        lines.pop();
    }
    taken.reverse();
    taken
}

fn trim_trailing_blank(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}
