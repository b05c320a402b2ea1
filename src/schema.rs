use schemars::schema_for;

use crate::model::Strategy;

/// Print the JSON Schema for `Strategy`, the contract the generator targets.
pub fn run() -> anyhow::Result<()> {
    let schema = schema_for!(Strategy);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
