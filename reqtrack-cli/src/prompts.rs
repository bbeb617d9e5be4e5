use anyhow::Result;
use inquire::{Confirm, CustomType, Select, Text};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use reqtrack_core::{NewRequest, Request, RequestField};

/// Prompts the user for a new request (the request form)
pub fn prompt_new_request() -> Result<NewRequest> {
    let requester_name = Text::new("Requester name:")
        .with_validator(inquire::required!("Requester name is required"))
        .prompt()?;

    let purpose = inquire::Editor::new("Request purpose:").prompt()?;

    let amount_requested = CustomType::<Decimal>::new("Amount requested:")
        .with_error_message("Please enter a valid amount, e.g. 120.50")
        .prompt()?;

    Ok(NewRequest::new(requester_name, purpose, amount_requested))
}

/// Prompts for column edits on an existing request
/// Returns the column → value mapping to apply
pub fn prompt_edit_request(request: &Request) -> Result<BTreeMap<String, String>> {
    let editable: Vec<RequestField> = RequestField::ALL
        .into_iter()
        .filter(|f| !f.is_immutable())
        .collect();

    let mut changes = BTreeMap::new();
    loop {
        let field = Select::new("Column to edit:", editable.clone()).prompt()?;
        let current = request.field_value(field);
        let value = Text::new(&format!("{}:", field.header()))
            .with_initial_value(&current)
            .prompt()?;
        changes.insert(field.header().to_string(), value);

        if !Confirm::new("Edit another column?")
            .with_default(false)
            .prompt()?
        {
            break;
        }
    }

    Ok(changes)
}
