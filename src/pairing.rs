use crate::ir::Ty;
use crate::value::Value;

/// Flatten composite values against target descriptors for positional checks.
///
/// - One target type: every value of every row is paired with it
///   (homogeneous containers pass one value per row).
/// - Otherwise each row is zipped against `types` and the results are
///   concatenated. A tuple is a single row; a map is one `[key, value]` row
///   per entry.
///
/// The zip stops at the shorter side. Callers that care about arity check it
/// before pairing.
pub fn pair_values_with_types<'a, R>(rows: R, types: &'a [Ty]) -> Vec<(&'a Value, &'a Ty)>
where
    R: IntoIterator<Item = Vec<&'a Value>>,
{
    match types {
        [only] => rows
            .into_iter()
            .flatten()
            .map(|value| (value, only))
            .collect(),
        _ => rows
            .into_iter()
            .flat_map(|row| row.into_iter().zip(types.iter()))
            .collect(),
    }
}
