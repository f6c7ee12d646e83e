//! Record, Settings and VaultContents — the plaintext data model.
//!
//! These are the types that get serialized, encrypted and written to
//! disk as one unit.  Older vaults stored a bare list of records with no
//! settings and sometimes a comma-separated `tags` string; both shapes
//! are accepted on read and canonicalized.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{LockaError, Result};

/// What a masked password looks like on screen.
const PASSWORD_MASK: &str = "********";

/// A single credential entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display label (e.g. "GitHub").  Never blank.
    pub site: String,

    /// Account identifier; may be empty.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub password: String,

    /// Ordered, trimmed, non-empty tags.  Duplicates are kept.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

impl Record {
    pub fn new(
        site: impl Into<String>,
        id: impl Into<String>,
        password: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            site: site.into(),
            id: id.into(),
            password: password.into(),
            tags,
        }
    }

    /// Canonicalize tags and reject a blank site.
    ///
    /// Applied to every record entering the vault through the API.
    pub fn normalized(mut self) -> Result<Self> {
        self.site = self.site.trim().to_string();
        if self.site.is_empty() {
            return Err(LockaError::InvalidRecord("site cannot be empty".into()));
        }
        self.tags = normalize_tags(self.tags);
        Ok(self)
    }

    /// The password as it should appear on screen under `settings`.
    pub fn displayed_password(&self, settings: &Settings) -> &str {
        if settings.show_password {
            &self.password
        } else {
            PASSWORD_MASK
        }
    }

    /// Case-insensitive match against site, id and tags.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.site.to_lowercase().contains(&query)
            || self.id.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Per-vault preferences stored alongside the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_show_password")]
    pub show_password: bool,
}

fn default_show_password() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_password: default_show_password(),
        }
    }
}

/// Everything that is encrypted into the vault file.
///
/// Serialized as `{"items": [...], "settings": {...}}`.  Deserialization
/// also accepts a bare record list and fills in default settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultContents {
    #[serde(rename = "items")]
    pub records: Vec<Record>,
    pub settings: Settings,
}

impl<'de> Deserialize<'de> for VaultContents {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapped {
            #[serde(default)]
            items: Vec<Record>,
            #[serde(default)]
            settings: Settings,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Legacy(Vec<Record>),
            Wrapped(Wrapped),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Legacy(records) => Self {
                records,
                settings: Settings::default(),
            },
            Shape::Wrapped(w) => Self {
                records: w.items,
                settings: w.settings,
            },
        })
    }
}

/// Trim every tag and drop the empty ones, keeping order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split a comma-separated tag string and canonicalize it.
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::One(s)) => parse_tags(&s),
        Some(Tags::Many(list)) => normalize_tags(list),
    })
}

/// Render one record as a list line, masking the password unless the
/// settings say otherwise.
pub fn format_for_display(record: &Record, settings: &Settings) -> String {
    let mut line = format!(
        "{} | {} | {}",
        record.site,
        record.id,
        record.displayed_password(settings)
    );
    if !record.tags.is_empty() {
        line.push_str(&format!(" [{}]", record.tags.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_empties_dropped() {
        let tags = normalize_tags(["  work ", "", "   ", "home", "work"]);
        assert_eq!(tags, vec!["work", "home", "work"]);
    }

    #[test]
    fn tags_accept_string_or_list_on_read() {
        let r: Record =
            serde_json::from_str(r#"{"site":"A","id":"a","password":"p","tags":"x, ,y"}"#)
                .unwrap();
        assert_eq!(r.tags, vec!["x", "y"]);

        let r: Record =
            serde_json::from_str(r#"{"site":"A","tags":[" x ","", "y"]}"#).unwrap();
        assert_eq!(r.tags, vec!["x", "y"]);
        assert_eq!(r.id, "");

        let r: Record = serde_json::from_str(r#"{"site":"A","tags":null}"#).unwrap();
        assert!(r.tags.is_empty());
    }

    #[test]
    fn legacy_bare_list_gets_default_settings() {
        let contents: VaultContents =
            serde_json::from_str(r#"[{"site":"A","id":"a","password":"p","tags":[]}]"#).unwrap();
        assert_eq!(contents.records.len(), 1);
        assert_eq!(contents.settings, Settings::default());
        assert!(contents.settings.show_password);
    }

    #[test]
    fn wrapped_shape_uses_items_key() {
        let contents = VaultContents {
            records: vec![Record::new("A", "a", "p", vec![])],
            settings: Settings {
                show_password: false,
            },
        };
        let json = serde_json::to_value(&contents).unwrap();
        assert!(json.get("items").is_some());
        assert_eq!(json["settings"]["show_password"], false);

        let back: VaultContents = serde_json::from_value(json).unwrap();
        assert_eq!(back, contents);
    }

    #[test]
    fn normalized_rejects_blank_site() {
        assert!(Record::new("   ", "", "", vec![]).normalized().is_err());
        let r = Record::new(" Site ", "", "", vec![" t ".into(), "".into()])
            .normalized()
            .unwrap();
        assert_eq!(r.site, "Site");
        assert_eq!(r.tags, vec!["t"]);
    }

    #[test]
    fn display_masks_password_when_hidden() {
        let r = Record::new("Example", "alice", "p@ss", vec!["work".into()]);
        let shown = format_for_display(&r, &Settings { show_password: true });
        assert_eq!(shown, "Example | alice | p@ss [work]");

        let hidden = format_for_display(&r, &Settings { show_password: false });
        assert!(!hidden.contains("p@ss"));
        assert!(hidden.contains(PASSWORD_MASK));
    }

    #[test]
    fn search_matches_site_id_and_tags() {
        let r = Record::new("GitHub", "octocat", "x", vec!["Work".into()]);
        assert!(r.matches("git"));
        assert!(r.matches("OCTO"));
        assert!(r.matches("work"));
        assert!(r.matches(""));
        assert!(!r.matches("bank"));
    }
}
