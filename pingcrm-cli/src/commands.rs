use crate::{input, CliError};
use clap::Subcommand;
use pingcrm::{
    exchange::Exchange,
    resources::{ListParams, Resource, ResourceKind},
    validation::Validate,
    view::{FormErrors, Table, Tabular},
    ApiError, Client
};
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Subcommand)]
pub enum Action {
    /// Show one page of entities
    List {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        skip: Option<u32>
    },
    /// Show a single entity
    Get { id: String },
    /// Create an entity from `--set field=value` assignments
    Create {
        #[arg(long = "set", value_parser = input::parse_assignment)]
        fields: Vec<(String, String)>
    },
    /// Change the given fields of an entity
    Update {
        id: String,
        #[arg(long = "set", value_parser = input::parse_assignment)]
        fields: Vec<(String, String)>
    },
    /// Delete an entity
    Delete { id: String }
}

/// Print the form errors a rejected input produced.
fn rejected(form: FormErrors, action: &'static str) -> CliError {
    eprint!("{}", form);
    CliError::Rejected(action)
}

/// Every failed mutation ends up on the form. Errors without field errors or a server detail
/// get the generic banner.
fn mutation_failed(err: ApiError, action: &'static str, kind: ResourceKind) -> CliError {
    debug!(error = %err, action, "mutation failed");
    rejected(FormErrors::from_api_error(&err, action, kind), action)
}

fn print_one<E: Tabular>(resource: &Resource<E::Attributes>) {
    print!("{}", Table::for_one::<E>(resource));
}

pub async fn run<E, M>(client: &Client<M>, action: Action) -> Result<(), CliError>
where
    E: Tabular,
    E::Create: DeserializeOwned,
    E::Patch: DeserializeOwned,
    M: Exchange
{
    let resources = client.resource::<E>();
    let kind = resources.kind();

    match action {
        Action::List { limit, skip } => {
            let page = resources.list(ListParams { limit, skip }).await?;
            let table = Table::for_list::<E>(&page);
            print!("{}", table);
            println!("{} of {} {}", table.rows.len(), table.total, kind);
        }
        Action::Get { id } => {
            let document = resources.get(&id).await?;
            print_one::<E>(&document.data);
        }
        Action::Create { fields } => {
            let input: E::Create = input::from_assignments(&fields)?;
            if let Err(errors) = input.validate() {
                return Err(rejected(FormErrors::from_validation(errors), "creating"));
            }
            let created = resources
                .create(&input)
                .await
                .map_err(|e| mutation_failed(e, "creating", kind))?;
            debug!(id = %created.id, "Created {}", kind.singular());
            print_one::<E>(&created);
        }
        Action::Update { id, fields } => {
            let patch: E::Patch = input::from_assignments(&fields)?;
            if let Err(errors) = patch.validate() {
                return Err(rejected(FormErrors::from_validation(errors), "updating"));
            }
            let updated = resources
                .update(&id, &patch)
                .await
                .map_err(|e| mutation_failed(e, "updating", kind))?;
            print_one::<E>(&updated);
        }
        Action::Delete { id } => {
            resources
                .remove(&id)
                .await
                .map_err(|e| mutation_failed(e, "deleting", kind))?;
            println!("Deleted {} {}", kind.singular(), id);
        }
    }
    Ok(())
}
