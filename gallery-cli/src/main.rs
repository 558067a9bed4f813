use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};

use gallery_core::config::Config;
use gallery_core::controller::{FormField, Gallery, Message, UploadFile};
use gallery_core::error::GalleryError;
use gallery_core::models::ImageId;
use gallery_core::notice::NoticeKind;
use gallery_core::paths::GalleryPaths;
use gallery_core::render::{html, GridView, Renderer};
use gallery_core::runtime::{drive, run_until_idle};
use gallery_core::service::{AutoConfirm, Confirm, Services};
use gallery_core::theme::Theme;
use gallery_http::HttpGallery;

#[derive(Parser)]
#[command(name = "gallery", about = "Browse and manage an image gallery server")]
struct Cli {
    /// Server base URL (overrides the config file)
    #[arg(long, global = true, env = "GALLERY_SERVER")]
    server: Option<url::Url>,
    /// Account to sign in with
    #[arg(long, global = true, env = "GALLERY_USER")]
    user: Option<String>,
    #[arg(long, global = true, env = "GALLERY_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List images, optionally filtered
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Print the rendered page instead of a table
        #[arg(long)]
        html: bool,
    },
    /// List the tag vocabulary
    Tags,
    /// Show one image
    Show {
        id: ImageId,
        #[arg(long)]
        html: bool,
    },
    /// Upload an image file
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Edit an image's metadata
    Edit {
        id: ImageId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete an image
    Delete {
        id: ImageId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show the signed-in account
    Whoami,
    /// Create an account with --user and --password
    Register,
    /// Light/dark preference
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    Get,
    Set { theme: Theme },
    Toggle,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective config
    Show,
    /// Write the default config if none exists
    Init,
}

/// Asks on the terminal; anything but y/yes declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gallery=warn,gallery_core=warn,gallery_http=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let paths = GalleryPaths::new()?;
    let mut config = Config::load_or_default(&paths);
    if let Some(server) = cli.server.clone() {
        config.server.base_url = server;
    }
    let username = cli.user.clone().or_else(|| config.account.username.clone());

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Path => println!("{}", paths.config_file().display()),
            ConfigAction::Show => print!("{}", toml::to_string_pretty(&config)?),
            ConfigAction::Init => {
                if paths.config_file().exists() {
                    println!("config already exists: {}", paths.config_file().display());
                } else {
                    paths.ensure_dirs()?;
                    Config::default().save(&paths)?;
                    println!("wrote {}", paths.config_file().display());
                }
            }
        },
        Commands::Theme { action } => {
            let theme = match action {
                ThemeAction::Get => config.ui.theme,
                ThemeAction::Set { theme } => theme,
                ThemeAction::Toggle => config.ui.theme.toggle(),
            };
            if theme != config.ui.theme {
                config.ui.theme = theme;
                paths.ensure_dirs()?;
                config.save(&paths)?;
            }
            println!("{theme}");
        }
        Commands::Register => {
            let client = HttpGallery::new(&config.server)?;
            let (user, password) = credentials(username.as_deref(), cli.password.as_deref())?;
            client.register(user, password).await?;
            println!("registered {user}, you can now sign in");
        }
        command => {
            let client = Arc::new(HttpGallery::new(&config.server)?);
            if let Some(user) = username.as_deref() {
                let password = cli
                    .password
                    .as_deref()
                    .context("--password (or GALLERY_PASSWORD) is required with --user")?;
                let actor = client.login(user, password).await?;
                tracing::info!(user = %actor.username, "signed in");
            }
            let failed = run_gallery_command(command, Arc::clone(&client), &config).await?;
            if username.is_some() {
                client.logout().await?;
            }
            if failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Runs a command against a loaded gallery. Returns true when any error notice
/// was raised along the way.
async fn run_gallery_command(
    command: Commands,
    client: Arc<HttpGallery>,
    config: &Config,
) -> Result<bool> {
    let confirm: Arc<dyn Confirm> = match &command {
        Commands::Delete { yes: true, .. } => Arc::new(AutoConfirm(true)),
        _ => Arc::new(StdinConfirm),
    };
    let mut ui = config.ui.clone();
    // one-shot commands settle the search immediately and never wait on notices
    ui.search_debounce_ms = 0;
    ui.auto_dismiss = false;

    let renderer = Renderer::new(config.server.uploads_url()?);
    let (mut gallery, boot) = Gallery::new(Services::from_shared(client), confirm, renderer, &ui);
    run_until_idle(&mut gallery, boot).await;

    match command {
        Commands::List { search, tag, html } => {
            let mut messages = Vec::new();
            if let Some(search) = search {
                messages.push(Message::SearchChanged(search));
            }
            if let Some(tag) = tag {
                messages.push(Message::TagSelected(tag));
            }
            drive(&mut gallery, messages).await;

            let view = gallery.view();
            if html {
                println!("{}", html::render_view(&view));
            } else {
                match &view.grid {
                    GridView::Empty { message } => println!("{message}"),
                    GridView::Cells(cells) => {
                        for cell in cells {
                            let owner = if cell.owner_controls { "*" } else { " " };
                            println!(
                                "{owner}{:>5}  {}  [{}]",
                                cell.id,
                                cell.title,
                                cell.tags.join(", ")
                            );
                        }
                    }
                }
            }
        }
        Commands::Tags => {
            for tag in gallery.state().tags().as_slice() {
                println!("{tag}");
            }
        }
        Commands::Show { id, html } => {
            drive(&mut gallery, [Message::ImageClicked(id)]).await;
            let view = gallery.view();
            let preview = view.preview.as_ref().ok_or(GalleryError::ImageNotFound(id))?;
            if html {
                println!("{}", html::preview_dialog(preview));
            } else {
                println!("{}", preview.title);
                if let Some(desc) = &preview.description {
                    println!("{desc}");
                }
                if !preview.tags.is_empty() {
                    println!("tags: {}", preview.tags.join(", "));
                }
                println!("uploaded: {}", preview.created);
                println!("{}", preview.image_url);
            }
        }
        Commands::Upload {
            file,
            title,
            description,
            tags,
        } => {
            let content = tokio::fs::read(&file)
                .await
                .map_err(|_| GalleryError::FileNotFound(file.clone()))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            drive(
                &mut gallery,
                [
                    Message::OpenUpload,
                    Message::UploadFileChosen(UploadFile {
                        name,
                        content: Bytes::from(content),
                    }),
                    Message::UploadFieldChanged(FormField::Title, title),
                    Message::UploadFieldChanged(FormField::Description, description),
                    Message::UploadFieldChanged(FormField::Tags, tags),
                    Message::SubmitUpload,
                ],
            )
            .await;
        }
        Commands::Edit {
            id,
            title,
            description,
            tags,
        } => {
            drive(&mut gallery, [Message::OpenEdit(id)]).await;
            if gallery.dialogs().edit.is_none() {
                return Err(GalleryError::ImageNotFound(id).into());
            }
            let fields = [
                (FormField::Title, title),
                (FormField::Description, description),
                (FormField::Tags, tags),
            ];
            let mut messages: Vec<Message> = fields
                .into_iter()
                .filter_map(|(field, value)| value.map(|v| Message::EditFieldChanged(field, v)))
                .collect();
            messages.push(Message::SubmitEdit);
            drive(&mut gallery, messages).await;
        }
        Commands::Delete { id, .. } => {
            drive(&mut gallery, [Message::Delete(id)]).await;
        }
        Commands::Whoami => match gallery.state().actor() {
            Some(actor) => println!("{} (id {})", actor.username, actor.id),
            None => println!("not signed in"),
        },
        Commands::Register | Commands::Theme { .. } | Commands::Config { .. } => {}
    }

    Ok(print_notices(&gallery))
}

fn print_notices(gallery: &Gallery) -> bool {
    let notices = gallery.notices();
    for notice in notices.history() {
        match notice.kind {
            NoticeKind::Success => println!("{}", notice.text),
            NoticeKind::Error => eprintln!("error: {}", notice.text),
        }
    }
    notices.failed()
}

fn credentials<'a>(user: Option<&'a str>, password: Option<&'a str>) -> Result<(&'a str, &'a str)> {
    let user = user.context("--user (or GALLERY_USER) is required")?;
    let password = password.context("--password (or GALLERY_PASSWORD) is required")?;
    Ok((user, password))
}
