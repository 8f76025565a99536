use schemars::JsonSchema;
use serde::Deserialize;

use crate::dataset::{Action, DatasetRequest, Outcome, RecordInput};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DatasetParams {
    /// The action to perform: "create", "append", "stats", or "validate"
    #[schemars(with = "Action")]
    pub action: String,
    /// Path to the CSV file. Relative paths are placed in the output directory; without a .csv extension a name is derived from the language
    #[serde(default)]
    pub file_path: String,
    /// Records to append (required for "append"). Fields: text, source_url, date_extracted (YYYY-MM-DD), domain, language; all optional
    pub data: Option<Vec<RecordInput>>,
    /// Language of the dataset, used for the default file name and creation metadata
    pub language: Option<String>,
}

impl DatasetParams {
    /// An unknown action comes back as the failure envelope, not as a
    /// parameter error.
    pub fn into_request(self, default_language: Option<&str>) -> Result<DatasetRequest, Outcome> {
        let action: Action = match self.action.parse() {
            Ok(action) => action,
            Err(e) => return Err(Outcome::failed(&self.action, &self.file_path, e)),
        };
        Ok(DatasetRequest {
            action,
            file_path: self.file_path,
            data: self.data,
            language: self
                .language
                .filter(|l| !l.trim().is_empty())
                .or_else(|| default_language.map(str::to_string)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(action: &str, language: Option<&str>) -> DatasetParams {
        DatasetParams {
            action: action.into(),
            file_path: String::new(),
            data: None,
            language: language.map(str::to_string),
        }
    }

    #[test]
    fn known_actions_become_requests() {
        for (raw, expected) in [
            ("create", Action::Create),
            ("append", Action::Append),
            ("stats", Action::Stats),
            ("validate", Action::Validate),
        ] {
            let req = params(raw, None).into_request(None).unwrap();
            assert_eq!(req.action, expected);
        }
    }

    #[test]
    fn unknown_action_deserializes_then_fails_as_envelope() {
        let params: DatasetParams =
            serde_json::from_str(r#"{"action": "delete", "file_path": "x.csv"}"#).unwrap();
        let Err(outcome) = params.into_request(None) else {
            panic!("expected the failure envelope");
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "delete");
        assert_eq!(json["file_path"], "x.csv");
        assert!(json["error"].as_str().unwrap().contains("Unknown action"));
    }

    #[test]
    fn schema_still_lists_actions() {
        let schema = serde_json::to_string(&schemars::schema_for!(DatasetParams)).unwrap();
        for action in ["create", "append", "stats", "validate"] {
            assert!(schema.contains(&format!("\"{action}\"")), "missing {action}: {schema}");
        }
    }

    #[test]
    fn params_parse_loose_records() {
        let params: DatasetParams = serde_json::from_str(
            r#"{"action": "append", "file_path": "out.csv", "data": [{"text": "a"}, {}]}"#,
        )
        .unwrap();
        let data = params.data.unwrap();
        assert_eq!(data.len(), 2);
        assert!(data[1].text.is_none());
    }

    #[test]
    fn explicit_language_beats_default() {
        let req = params("create", Some("Yoruba"))
            .into_request(Some("English"))
            .unwrap();
        assert_eq!(req.language.as_deref(), Some("Yoruba"));
    }

    #[test]
    fn default_language_fills_gap() {
        let req = params("create", None).into_request(Some("English")).unwrap();
        assert_eq!(req.language.as_deref(), Some("English"));
    }
}
