use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("dictionary YAML is invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("dictionary has no version")]
    MissingVersion,

    #[error("deprecated path '{path}' points at '{replacement}', which is itself deprecated")]
    ChainedDeprecation { path: String, replacement: String },

    #[error("deprecated path '{path}' has an empty replacement")]
    EmptyReplacement { path: String },
}
