use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rotation::WidgetStore;
use shared::domain::{GroupId, PathDescriptor, WidgetAction, WidgetDefinition, WidgetId};
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/widgets.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateGroup {
        label: String,
    },
    AddPath {
        group_id: String,
        target: String,
        /// Store a labelled (composite) descriptor.
        #[arg(long)]
        label: Option<String>,
    },
    CreateWidget {
        #[arg(long)]
        group: String,
        #[arg(long, value_enum, default_value = "random")]
        action: ActionArg,
        #[arg(long)]
        refresh_hours: Option<f64>,
        /// Defaults to a generated id.
        #[arg(long)]
        id: Option<String>,
    },
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActionArg {
    Static,
    Random,
    Sequential,
    Merged,
}

impl From<ActionArg> for WidgetAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Static => Self::Static,
            ActionArg::Random => Self::Random,
            ActionArg::Sequential => Self::Sequential,
            ActionArg::Merged => Self::Merged,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::CreateGroup { label } => {
            let group_id = storage.create_group(&label).await?;
            println!("created group_id={group_id}");
        }
        Command::AddPath {
            group_id,
            target,
            label,
        } => {
            let path = match label {
                Some(label) => PathDescriptor::composite(label, target),
                None => PathDescriptor::simple(target),
            };
            let path_id = storage.add_path(&GroupId::new(group_id), &path).await?;
            println!("added path_id={path_id}");
        }
        Command::CreateWidget {
            group,
            action,
            refresh_hours,
            id,
        } => {
            let id = id.map(WidgetId::new).unwrap_or_else(WidgetId::generate);
            let mut widget = WidgetDefinition::new(id, GroupId::new(group), action.into());
            widget.refresh_hours = refresh_hours;
            if let Err(error) = widget.validate() {
                bail!("refusing to create widget: {error}");
            }
            storage.create_widget(&widget).await?;
            println!("created widget_id={}", widget.id);
        }
        Command::List => {
            for group in storage.find_defined_groups().await? {
                println!("group {} ({})", group.id, group.label);
                for path in storage.find_defined_paths(&group.id).await? {
                    println!("  path {}", serde_json::to_string(&path)?);
                }
                for widget in storage.find_defined_widgets(Some(&group.id)).await? {
                    println!("  widget {}", serde_json::to_string(&widget)?);
                }
            }
        }
    }

    Ok(())
}
