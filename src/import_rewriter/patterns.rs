//! # Import Patterns
//!
//! Regole di sostituzione testuale per i riferimenti agli asset.
//!
//! Otto regole, applicate in ordine: {`from`, `import`, `require(...)`, stringa
//! nuda} × {`../`, `./`}. Ogni regola riscrive solo il segmento di directory
//! degli asset e conserva prefisso, resto del path e tipo di virgolette.
//! Non è un parser: codice riformattato in modo creativo può sfuggire.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::fmt;

/// Syntactic shape of an asset reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxForm {
    From,
    Import,
    Require,
    StringLiteral,
}

impl SyntaxForm {
    pub const ALL: [SyntaxForm; 4] = [Self::From, Self::Import, Self::Require, Self::StringLiteral];

    fn lead(&self) -> &'static str {
        match self {
            Self::From => r"\bfrom\s+",
            Self::Import => r"\bimport\s+",
            Self::Require => r"\brequire\(\s*",
            Self::StringLiteral => "",
        }
    }

    fn tail(&self) -> &'static str {
        match self {
            Self::Require => r"\s*\)",
            _ => "",
        }
    }
}

impl fmt::Display for SyntaxForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::From => "from",
            Self::Import => "import",
            Self::Require => "require",
            Self::StringLiteral => "string literal",
        };
        f.write_str(name)
    }
}

/// Relative base in front of the asset directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasePrefix {
    Parent,
    Sibling,
}

impl BasePrefix {
    pub const ALL: [BasePrefix; 2] = [Self::Parent, Self::Sibling];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parent => "../",
            Self::Sibling => "./",
        }
    }
}

/// Substitutions per syntactic form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormCounts {
    pub from: usize,
    pub import: usize,
    pub require: usize,
    pub string_literal: usize,
}

impl FormCounts {
    pub fn total(&self) -> usize {
        self.from + self.import + self.require + self.string_literal
    }

    fn bump(&mut self, form: SyntaxForm, by: usize) {
        match form {
            SyntaxForm::From => self.from += by,
            SyntaxForm::Import => self.import += by,
            SyntaxForm::Require => self.require += by,
            SyntaxForm::StringLiteral => self.string_literal += by,
        }
    }

    pub fn merge(&mut self, other: &FormCounts) {
        self.from += other.from;
        self.import += other.import;
        self.require += other.require;
        self.string_literal += other.string_literal;
    }
}

/// Output of a text pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub counts: FormCounts,
}

impl Rewrite {
    pub fn changed(&self) -> bool {
        self.counts.total() > 0
    }
}

struct Rule {
    form: SyntaxForm,
    base: BasePrefix,
    regex: Regex,
}

/// Compiled, ordered rule set
pub struct PatternSet {
    rules: Vec<Rule>,
    compressed_dir: String,
    rewrite_to_webp: bool,
    raster_ext: Regex,
}

impl PatternSet {
    pub fn new(asset_dir: &str, compressed_dir: &str, rewrite_to_webp: bool) -> Result<Self> {
        let mut rules = Vec::with_capacity(SyntaxForm::ALL.len() * BasePrefix::ALL.len());

        for form in SyntaxForm::ALL {
            for base in BasePrefix::ALL {
                let pattern = format!(
                    r#"(?P<lead>{lead})(?P<open>["'])(?P<base>{base}){dir}/(?P<rest>[^"'\r\n]*)(?P<close>["'])(?P<tail>{tail})"#,
                    lead = form.lead(),
                    base = regex::escape(base.as_str()),
                    dir = regex::escape(asset_dir),
                    tail = form.tail(),
                );
                let regex = Regex::new(&pattern)
                    .with_context(|| format!("Invalid {} pattern for {}", form, base.as_str()))?;
                rules.push(Rule { form, base, regex });
            }
        }

        Ok(Self {
            rules,
            compressed_dir: compressed_dir.to_string(),
            rewrite_to_webp,
            raster_ext: Regex::new(r"(?i)\.(jpe?g|png)$")?,
        })
    }

    /// Apply every rule in order. Pure: no IO.
    pub fn rewrite_text(&self, input: &str) -> Rewrite {
        let mut text = input.to_string();
        let mut counts = FormCounts::default();

        for rule in &self.rules {
            let mut hits = 0;
            let replaced = rule.regex.replace_all(&text, |caps: &Captures| {
                // no backreferences in `regex`: quote pairing is checked here
                if caps["open"] != caps["close"] {
                    return caps[0].to_string();
                }
                hits += 1;
                format!(
                    "{}{}{}{}/{}{}{}",
                    &caps["lead"],
                    &caps["open"],
                    &caps["base"],
                    self.compressed_dir,
                    self.rename_rest(&caps["rest"]),
                    &caps["close"],
                    &caps["tail"],
                )
            });

            if hits > 0 {
                text = replaced.into_owned();
                counts.bump(rule.form, hits);
                tracing::trace!("{} x{} ({})", rule.form, hits, rule.base.as_str());
            }
        }

        Rewrite { text, counts }
    }

    fn rename_rest(&self, rest: &str) -> String {
        if self.rewrite_to_webp {
            self.raster_ext.replace(rest, ".webp").into_owned()
        } else {
            rest.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> PatternSet {
        PatternSet::new("assets", "assets-compressed", false).unwrap()
    }

    #[test]
    fn test_from_import_parent_and_sibling() {
        let input = "import hero from \"../assets/images/hero.jpg\";\nimport logo from './assets/images/logo.png';\n";
        let out = patterns().rewrite_text(input);

        assert_eq!(
            out.text,
            "import hero from \"../assets-compressed/images/hero.jpg\";\nimport logo from './assets-compressed/images/logo.png';\n"
        );
        assert_eq!(out.counts.from, 2);
        assert_eq!(out.counts.total(), 2);
    }

    #[test]
    fn test_side_effect_import_and_require() {
        let input = "import '../assets/styles/bg.png';\nconst v = require( \"./assets/vibe/vibe.mp4\" );\n";
        let out = patterns().rewrite_text(input);

        assert_eq!(
            out.text,
            "import '../assets-compressed/styles/bg.png';\nconst v = require( \"./assets-compressed/vibe/vibe.mp4\" );\n"
        );
        assert_eq!(out.counts.import, 1);
        assert_eq!(out.counts.require, 1);
    }

    #[test]
    fn test_jsx_string_literal() {
        let input = r#"<img src="../assets/team/yaya.png" alt='./assets/x' />"#;
        let out = patterns().rewrite_text(input);

        assert_eq!(
            out.text,
            r#"<img src="../assets-compressed/team/yaya.png" alt='./assets-compressed/x' />"#
        );
        assert_eq!(out.counts.string_literal, 2);
    }

    #[test]
    fn test_mismatched_quotes_are_left_alone() {
        let input = r#"const a = "../assets/images/a.jpg';"#;
        let out = patterns().rewrite_text(input);
        assert_eq!(out.text, input);
        assert!(!out.changed());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let input = "import a from '../assets/images/a.jpg';\nconst b = require('./assets/b.png');\n";
        let set = patterns();
        let first = set.rewrite_text(input);
        let second = set.rewrite_text(&first.text);

        assert!(first.changed());
        assert_eq!(second.text, first.text);
        assert_eq!(second.counts.total(), 0);
    }

    #[test]
    fn test_other_paths_are_untouched() {
        let input = "import x from '../../assets/a.jpg';\nimport y from 'assets/a.jpg';\nimport z from './myassets/a.jpg';\n";
        let out = patterns().rewrite_text(input);
        assert_eq!(out.text, input);
    }

    #[test]
    fn test_webp_substitution() {
        let set = PatternSet::new("assets", "assets-compressed", true).unwrap();
        let input = "import a from '../assets/a.JPG';\nimport b from './assets/b.jpeg';\nimport c from './assets/c.gif';\nimport d from './assets/d.mp4';\n";
        let first = set.rewrite_text(input);

        assert_eq!(
            first.text,
            "import a from '../assets-compressed/a.webp';\nimport b from './assets-compressed/b.webp';\nimport c from './assets-compressed/c.gif';\nimport d from './assets-compressed/d.mp4';\n"
        );
        assert_eq!(set.rewrite_text(&first.text).text, first.text);
    }
}
