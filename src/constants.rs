//! Defaults shared by the CLI, the config layer and the pipeline stages

// Output table written by the persister
pub const DEFAULT_TABLE_NAME: &str = "Message";

// Column names expected in the input files
pub const DEFAULT_JOIN_KEY: &str = "id";
pub const DEFAULT_CATEGORY_COLUMN: &str = "categories";

// Encoded category string: `name-value` tokens joined by `;`
pub const TOKEN_SEPARATOR: char = ';';
pub const NAME_VALUE_SEPARATOR: char = '-';

// Suffixes applied to colliding column names (messages side, categories side)
pub const LEFT_SUFFIX: &str = "_x";
pub const RIGHT_SUFFIX: &str = "_y";

pub const DEFAULT_CONFIG_FILE: &str = "etl.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "etl.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const USAGE: &str = "Please provide the filepaths of the messages and categories \
datasets as the first and second argument respectively, as \
well as the filepath of the database to save the cleaned data \
to as the third argument. \n\nExample: process_data \
disaster_messages.csv disaster_categories.csv \
DisasterResponse.db";
