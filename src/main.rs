use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use socialchain::feed::{page_controls, PageItem};
use socialchain::types::PostId;
use socialchain::{Address, CliArgs, Config, FeedSource, SocialClient};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "socialchain", about = "Client for the on-chain social network", version)]
struct Cli {
    #[command(flatten)]
    cfg: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a profile (defaults to the connected wallet)
    Profile { address: Option<String> },
    /// List a page of posts from a feed
    Feed {
        /// "global", "following", or an address for that account's posts
        #[arg(long, default_value = "global")]
        source: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Register the connected wallet
    Register {
        username: String,
        #[arg(default_value = "")]
        bio: String,
    },
    /// Change the connected wallet's username
    SetUsername { username: String },
    /// Change the connected wallet's bio
    SetBio { bio: String },
    /// Create a post from a content URI, or pin a local file first
    Post {
        /// Metadata URI to post directly
        content_uri: Option<String>,
        /// Local file to pin; metadata is pinned alongside it
        #[arg(long, conflicts_with = "content_uri")]
        file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        tag: Vec<String>,
    },
    /// Replace a post's content URI
    UpdatePost { id: u64, content_uri: String },
    /// Delete one of the connected wallet's posts
    DeletePost { id: u64 },
    Like { id: u64 },
    Dislike { id: u64 },
    Report { id: u64 },
    Follow { address: String },
    Unfollow { address: String },
    /// Check the pinning-service credential
    TestAuth,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let cfg = Config::from_args(&cli.cfg)?;
    let client = SocialClient::new(&cfg)?;

    match cli.command {
        Command::Profile { address } => {
            let address = match address {
                Some(s) => s.parse::<Address>()?,
                None => client.session().require()?,
            };
            let profile = client.profile(&address).await?;
            if !profile.exists {
                println!("{address} is not registered");
                return Ok(());
            }
            println!("{} ({address})", profile.username);
            if !profile.bio.is_empty() {
                println!("  {}", profile.bio);
            }
            println!(
                "  reputation {}  posts {}  followers {}  following {}",
                profile.reputation,
                profile.post_count,
                profile.followers_count,
                profile.following_count
            );
        }
        Command::Feed { source, page } => {
            let source = match source.as_str() {
                "global" => FeedSource::Global,
                "following" => {
                    FeedSource::Following(client.session().require()?)
                }
                other => FeedSource::Profile(
                    other
                        .parse::<Address>()
                        .with_context(|| format!("unknown feed source '{other}'"))?,
                ),
            };
            let (posts, total_pages) = client.posts_page(&source, page).await?;
            if posts.is_empty() {
                println!("no posts on page {page}");
            }
            for post in posts {
                println!("#{}  {}  {}", post.id, post.author, post.when);
                println!("  {}", post.content_uri);
                if let Some(media) = client.resolve_media(&post).await {
                    if !media.metadata.title.is_empty() {
                        println!("  {} [{:?}]", media.metadata.title, media.kind);
                    }
                }
                println!(
                    "  likes {}  dislikes {}  reports {}",
                    post.like_count, post.dislike_count, post.report_count
                );
            }
            let strip: Vec<String> = page_controls(page, total_pages)
                .into_iter()
                .map(|item| match item {
                    PageItem::Number(n) if n == page => format!("[{n}]"),
                    PageItem::Number(n) => n.to_string(),
                    PageItem::Ellipsis => "...".to_string(),
                })
                .collect();
            if !strip.is_empty() {
                println!("{}", strip.join(" "));
            }
        }
        Command::Register { username, bio } => {
            let receipt = client.register(&username, &bio).await?;
            println!("registered in block {}", receipt.block_number);
        }
        Command::SetUsername { username } => {
            client.update_username(&username).await?;
            println!("username updated");
        }
        Command::SetBio { bio } => {
            client.update_bio(&bio).await?;
            println!("bio updated");
        }
        Command::Post {
            content_uri,
            file,
            title,
            description,
            tag,
        } => match (content_uri, file) {
            (Some(uri), None) => {
                let receipt = client.create_post(&uri).await?;
                println!("posted in block {}", receipt.block_number);
            }
            (None, Some(path)) => {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                let (receipt, pinned) = client
                    .create_post_with_upload(&name, bytes, &title, &description, tag)
                    .await?;
                println!("pinned {}", pinned.url);
                println!("posted in block {}", receipt.block_number);
            }
            _ => bail!("provide either a content URI or --file"),
        },
        Command::UpdatePost { id, content_uri } => {
            client.update_post(PostId(id), &content_uri).await?;
            println!("post {id} updated");
        }
        Command::DeletePost { id } => {
            client.delete_post(PostId(id)).await?;
            println!("post {id} deleted");
        }
        Command::Like { id } => {
            client.like(PostId(id)).await?;
            println!("liked post {id}");
        }
        Command::Dislike { id } => {
            client.dislike(PostId(id)).await?;
            println!("disliked post {id}");
        }
        Command::Report { id } => {
            client.report(PostId(id)).await?;
            println!("reported post {id}");
        }
        Command::Follow { address } => {
            let target = address.parse::<Address>()?;
            client.follow(&target).await?;
            println!("following {target}");
        }
        Command::Unfollow { address } => {
            let target = address.parse::<Address>()?;
            client.unfollow(&target).await?;
            println!("unfollowed {target}");
        }
        Command::TestAuth => match client.pinning() {
            Some(pinning) if pinning.test_authentication().await => {
                println!("pinning credential ok")
            }
            Some(_) => bail!("pinning credential rejected"),
            None => bail!("PINATA_JWT is not configured"),
        },
    }
    Ok(())
}
