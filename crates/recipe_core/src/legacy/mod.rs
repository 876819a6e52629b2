//! Support for recipe rows stored before child tables existed.

pub mod array_field;

use crate::model::recipe::{LegacyColumns, LegacyRawColumns};
use array_field::{parse_legacy_array, LegacyColumn};

/// Parses all three flattened columns of a legacy recipe row.
pub fn parse_legacy_columns(raw: &LegacyRawColumns) -> LegacyColumns {
    LegacyColumns {
        instructions: parse_legacy_array(
            raw.instructions_raw.as_deref(),
            LegacyColumn::Instructions,
        ),
        ingredients: parse_legacy_array(raw.ingredients_raw.as_deref(), LegacyColumn::Ingredients),
        hashtags: parse_legacy_array(raw.hashtags_raw.as_deref(), LegacyColumn::Hashtags),
    }
}
