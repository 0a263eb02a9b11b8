//! Parsing of instantiation strings.
//!
//! An instantiation string names concrete values for quantified variables,
//! one `var=value` pair per comma-separated field: `"X=3,Y=-2,X=7,Z=d"`.
//! Repeated variables accumulate into a multi-valued binding. Integer-shaped
//! values become integer literals; anything else is read as a free integer
//! constant by that name.

use num_bigint::BigInt;

use crate::ast::TermManager;
use crate::error::{QuinceError, Result};
use crate::subst::SubstitutionMap;

/// Parse an instantiation string like `"X=3,Y=d"` into a substitution map.
///
/// # Errors
///
/// [`QuinceError::Parse`] on a field without `=`, an empty variable name, or
/// an empty value.
pub fn parse_inst(input: &str, manager: &mut TermManager) -> Result<SubstitutionMap> {
    let mut map = SubstitutionMap::new();
    for field in input.split(',') {
        let Some((var, value)) = field.split_once('=') else {
            return Err(QuinceError::Parse(format!(
                "expected `var=value`, got `{field}`"
            )));
        };
        let var = var.trim();
        let value = value.trim();
        if var.is_empty() {
            return Err(QuinceError::Parse(format!(
                "empty variable name in `{field}`"
            )));
        }
        if value.is_empty() {
            return Err(QuinceError::Parse(format!("empty value in `{field}`")));
        }

        let int_sort = manager.sorts.int_sort;
        let term = if is_integer_literal(value) {
            let parsed: BigInt = value
                .parse()
                .map_err(|_| QuinceError::Parse(format!("invalid integer `{value}`")))?;
            manager.mk_int(parsed)
        } else {
            manager.mk_const(value, int_sort)
        };

        let name = manager.intern(var);
        map.bind(name, term);
    }
    Ok(map)
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
