use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context};
use cadence_cli::services::{ChatSession, StreamEvent, GREETING, STREAM_CHANNEL_CAPACITY};
use cadence_cli::{all_schemas, NO_ACTIVE_DEVICE_MESSAGE};
use cadence_llm_client::LlmClient;
use cadence_shared_config::{AppConfig, SpotifyConfig};
use cadence_spotify_client::{MusicService, SpotifyClient};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

const USAGE: &str = "usage: cadence [authorize]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    cadence_shared_config::load_dotenv();

    // Initialize tracing on stderr so it does not interleave with replies
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL"))
                .unwrap_or_else(|_| "cadence_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => chat(AppConfig::from_env().context("Failed to load configuration")?).await,
        Some("authorize") => {
            authorize(SpotifyConfig::from_env().context("Failed to load Spotify configuration")?)
                .await
        }
        Some("-h" | "--help" | "help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

async fn chat(config: AppConfig) -> anyhow::Result<()> {
    if config.spotify.refresh_token.is_none() {
        bail!("SPOTIFY_REFRESH_TOKEN is not set. Run `cadence authorize` first.");
    }

    let spotify = Arc::new(SpotifyClient::new(&config.spotify)?);

    if !spotify
        .has_active_device()
        .await
        .context("Failed to list Spotify devices")?
    {
        eprintln!("{}", NO_ACTIVE_DEVICE_MESSAGE);
        std::process::exit(1);
    }

    match spotify.profile().await {
        Ok(profile) => {
            let name = profile.display_name.as_deref().unwrap_or(&profile.id);
            match &profile.url {
                Some(url) => println!("Logged in as {} ({})", name, url),
                None => println!("Logged in as {}", name),
            }
            if let Some(image) = &profile.image_url {
                println!("Avatar: {}", image);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to load Spotify profile"),
    }

    tracing::info!(
        environment = %config.environment,
        model = %config.llm.model,
        synthesis = %config.chat.synthesis_policy,
        "Starting chat session"
    );

    let llm = LlmClient::new(&config.llm)?;
    let mut session = ChatSession::new(llm, spotify, config.chat.clone());

    println!("Commands: /clear, /tools, /quit\n");
    println!("{}\n", GREETING);

    let mut lines = stdin_lines();
    loop {
        prompt("> ");
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("{}\n", GREETING);
                continue;
            }
            "/tools" => {
                for schema in all_schemas() {
                    println!("  {}", schema.name);
                }
                println!();
                continue;
            }
            _ => {}
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        let turn = async {
            let tx = tx;
            session.process_turn(&line, &tx).await
        };
        let (result, ()) = tokio::join!(turn, render(rx));

        if let Err(e) = result {
            eprintln!("\nError: {}\n", e);
        }
    }

    Ok(())
}

/// Marker printed when a partial narration is thrown away
const DISCARD_MARKER: &str = "\n[narration interrupted, showing results instead]\n";

/// Print streamed events until the turn drops its sender
async fn render(mut rx: mpsc::Receiver<StreamEvent>) {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    while let Some(event) = rx.recv().await {
        let _ = render_event(&mut stdout, &mut stderr, event);
    }
}

/// Write one event: reply text to `out`, operation progress to `err`
fn render_event(
    out: &mut impl Write,
    err: &mut impl Write,
    event: StreamEvent,
) -> std::io::Result<()> {
    match event {
        StreamEvent::Token(text) => write!(out, "{}", text)?,
        StreamEvent::ToolCallStart { name, .. } => writeln!(err, "[{}]", name)?,
        StreamEvent::ToolCallComplete { name, ok: false, .. } => {
            writeln!(err, "[{} failed]", name)?
        }
        StreamEvent::ToolCallComplete { .. } => {}
        StreamEvent::Discard => writeln!(out, "{}", DISCARD_MARKER)?,
        StreamEvent::Complete { .. } => write!(out, "\n\n")?,
    }
    out.flush()
}

/// Extract the authorization code from a pasted redirect URL or bare code
fn authorization_code(pasted: &str) -> anyhow::Result<String> {
    let pasted = pasted.trim();
    let Ok(url) = Url::parse(pasted) else {
        if pasted.is_empty() {
            bail!("no authorization code given");
        }
        return Ok(pasted.to_string());
    };

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => bail!("Spotify denied the authorization: {}", value),
            _ => {}
        }
    }
    code.context("the pasted URL has no `code` parameter")
}

async fn authorize(config: SpotifyConfig) -> anyhow::Result<()> {
    let client = SpotifyClient::new(&config)?;

    println!("Open this URL in a browser and approve access:\n");
    println!("{}\n", client.authorize_url()?);
    prompt("Paste the URL you were redirected to (or just the code): ");

    let pasted = stdin_lines()
        .next_line()
        .await?
        .context("no input received")?;
    let code = authorization_code(&pasted)?;

    let grant = client
        .exchange_code(&code)
        .await
        .context("Failed to exchange the authorization code")?;
    let refresh_token = grant
        .refresh_token
        .context("Spotify did not return a refresh token")?;

    println!("\nAdd this to your environment or .env file:\n");
    println!("SPOTIFY_REFRESH_TOKEN={}", refresh_token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_code_from_redirect_url() {
        let code =
            authorization_code("http://127.0.0.1:8888/callback?code=AQB123&state=xyz").unwrap();
        assert_eq!(code, "AQB123");
    }

    #[test]
    fn test_authorization_code_bare() {
        assert_eq!(authorization_code("  AQB123\n").unwrap(), "AQB123");
        assert!(authorization_code("   ").is_err());
    }

    fn rendered(events: Vec<StreamEvent>) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        for event in events {
            render_event(&mut out, &mut err, event).unwrap();
        }
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_discarded_narration_is_marked() {
        let (out, _) = rendered(vec![
            StreamEvent::Token("You're listen".to_string()),
            StreamEvent::Discard,
            StreamEvent::Token("Currently playing: Yellow by Coldplay".to_string()),
        ]);

        let marker = out.find(DISCARD_MARKER.trim()).unwrap();
        assert!(out[..marker].contains("You're listen"));
        assert!(out[marker..].ends_with("Currently playing: Yellow by Coldplay"));
    }

    #[test]
    fn test_operation_progress_goes_to_stderr() {
        let (out, err) = rendered(vec![
            StreamEvent::ToolCallStart {
                index: 0,
                name: "pause_playback".to_string(),
            },
            StreamEvent::ToolCallComplete {
                index: 0,
                name: "pause_playback".to_string(),
                ok: false,
            },
            StreamEvent::Complete {
                message: "Done.".to_string(),
            },
        ]);

        assert_eq!(out, "\n\n");
        assert_eq!(err, "[pause_playback]\n[pause_playback failed]\n");
    }

    #[test]
    fn test_authorization_code_denied() {
        let err = authorization_code("http://127.0.0.1:8888/callback?error=access_denied")
            .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }
}
