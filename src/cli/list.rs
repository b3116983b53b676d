mod table;

use table::Table;

use crate::models::{self, MODELS};
use crate::{die, ListArgs, ListObject, ListingFormat};

#[derive(serde::Serialize, Debug, PartialEq)]
struct ListedModel {
    model_id: &'static str,
    label: &'static str,
    default: bool,
}

impl From<&[ListedModel]> for Table {
    fn from(value: &[ListedModel]) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["MODEL", "DEFAULT", "LABEL"]);

        for model in value {
            tab.add_row(vec![
                model.model_id,
                if model.default { "yes" } else { "no" },
                model.label,
            ]);
        }

        tab
    }
}

/// The allow-list, with the default marked according to `default_model`
fn listed_models(default_model: Option<&str>) -> Vec<ListedModel> {
    let default = match models::resolve(default_model) {
        Ok(model) => model,
        Err(err) => {
            crate::warn!("ignoring the configured default: {}", err);
            models::default_model()
        }
    };

    MODELS
        .iter()
        .map(|model| ListedModel {
            model_id: model.id,
            label: model.label,
            default: model == default,
        })
        .collect()
}

fn format_output(models: &[ListedModel], format: ListingFormat) -> String {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(models) {
            Ok(output) => output + "\n",
            Err(err) => die!("failed to serialize the listing: {}", err),
        },
        ListingFormat::Table => Table::from(models).to_string(),
        ListingFormat::HeaderlessTable => {
            let mut tab = Table::from(models);

            tab.print_header(false);

            tab.to_string()
        }
    }
}

pub(crate) fn list_cmd(default_model: Option<&str>, args: &ListArgs) {
    match &args.object {
        ListObject::Models => {
            let models = listed_models(default_model);

            print!("{}", format_output(&models, args.format));
        }
    }
}
