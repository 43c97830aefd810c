use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use lib::activity::{AttachmentRef, ChannelAccount, ConversationAccount, IncomingTurn, ReplyPayload};
use lib::gateway::{TurnResponse, WsRequest};
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const CHAT_USER_ID: &str = "chat-user";
const CHAT_BOT_ID: &str = "botin";

#[derive(Parser)]
#[command(name = "botin")]
#[command(about = "Botin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config, attachments directory, bundled resources).
    Init {
        /// Config file path (default: BOTIN_CONFIG_PATH or ~/.botin/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the gateway (HTTP turn endpoint + WebSocket).
    Gateway {
        /// Config file path (default: BOTIN_CONFIG_PATH or ~/.botin/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// WebSocket and HTTP port (default from config or 3978)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Talk to the bot through the gateway (interactive). `/attach <url> [name]` sends an attachment.
    Chat {
        /// Config file path (default: BOTIN_CONFIG_PATH or ~/.botin/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("botin {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config }) => {
            if let Err(e) = run_chat(config).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config, path).await
}

/// One line of chat input, parsed.
#[derive(Debug, PartialEq)]
enum ChatInput {
    Quit,
    Text(String),
    Attach { url: String, name: String },
}

fn parse_chat_input(line: &str) -> Option<ChatInput> {
    let input = line.trim_end_matches(['\r', '\n']);
    if input.trim().is_empty() {
        return None;
    }
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("/exit") || trimmed.eq_ignore_ascii_case("/quit") {
        return Some(ChatInput::Quit);
    }
    if let Some(rest) = trimmed.strip_prefix("/attach ") {
        let mut parts = rest.split_whitespace();
        let url = parts.next()?.to_string();
        let name = parts
            .next()
            .map(str::to_string)
            .or_else(|| {
                url.rsplit('/')
                    .next()
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "attachment".to_string());
        return Some(ChatInput::Attach { url, name });
    }
    // Menu selectors are exact, so the text is sent as typed.
    Some(ChatInput::Text(input.to_string()))
}

fn chat_turn(conversation_id: &str, input: ChatInput) -> Option<IncomingTurn> {
    let mut turn = IncomingTurn::message("", CHAT_USER_ID, CHAT_BOT_ID);
    turn.conversation = Some(ConversationAccount {
        id: conversation_id.to_string(),
    });
    match input {
        ChatInput::Quit => return None,
        ChatInput::Text(text) => turn.text = Some(text),
        ChatInput::Attach { url, name } => {
            turn.text = None;
            turn.attachments = vec![AttachmentRef::new(name, url)];
        }
    }
    Some(turn)
}

fn print_reply(reply: &ReplyPayload) {
    if let Some(ref text) = reply.text {
        println!("< {}", text);
    }
    for media in reply.media() {
        if media.is_inline() {
            println!("  [{} {} (inline, {} chars)]", media.name, media.content_type, media.content_url.len());
        } else {
            println!("  [{} {}] {}", media.name, media.content_type, media.content_url);
        }
    }
    for card in reply.cards() {
        if !card.text.is_empty() {
            println!("< {}", card.text);
        }
        for button in &card.buttons {
            println!("  ({}) -> {}", button.title, button.value);
        }
    }
}

async fn run_chat(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _) = lib::config::load_config(config_path)?;
    let ws_url = format!("ws://{}:{}/ws", config.gateway.bind.trim(), config.gateway.port);
    let (mut ws, _) = tokio_tungstenite::connect_async(&ws_url)
        .await
        .map_err(|e| anyhow::anyhow!("connecting to {}: {}", ws_url, e))?;

    let hello = request(&mut ws, WsRequest::new("connect", "connect", serde_json::json!({}))).await?;
    log::debug!("connected: {}", hello);

    let conversation_id = uuid::Uuid::new_v4().to_string();
    let mut join = IncomingTurn::membership_update(&[CHAT_USER_ID], CHAT_BOT_ID);
    join.conversation = Some(ConversationAccount {
        id: conversation_id.clone(),
    });
    join.from = ChannelAccount::new(CHAT_USER_ID);
    send_turn(&mut ws, 0, &join).await?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut next_id: u64 = 1;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let Some(input) = parse_chat_input(&line) else {
            continue;
        };
        let Some(turn) = chat_turn(&conversation_id, input) else {
            break;
        };
        if let Err(e) = send_turn(&mut ws, next_id, &turn).await {
            eprintln!("chat error: {}", e);
        }
        next_id += 1;
    }

    Ok(())
}

async fn send_turn(ws: &mut WsStream, id: u64, turn: &IncomingTurn) -> anyhow::Result<()> {
    let params = serde_json::to_value(turn)?;
    let payload = request(ws, WsRequest::new(format!("turn-{}", id), "turn", params)).await?;
    let response: TurnResponse = serde_json::from_value(payload)?;
    for reply in &response.replies {
        print_reply(reply);
    }
    Ok(())
}

/// Send one request frame and wait for the matching response; returns its payload.
async fn request(ws: &mut WsStream, req: WsRequest) -> anyhow::Result<serde_json::Value> {
    ws.send(Message::Text(serde_json::to_string(&req)?)).await?;
    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg? else { continue };
        let res: serde_json::Value = serde_json::from_str(&text)?;
        if res.get("type").and_then(|v| v.as_str()) == Some("event")
            && res.get("event").and_then(|v| v.as_str()) == Some("shutdown")
        {
            anyhow::bail!("gateway is shutting down");
        }
        if res.get("type").and_then(|v| v.as_str()) != Some("res") {
            continue;
        }
        if res.get("id").and_then(|v| v.as_str()) != Some(req.id.as_str()) {
            continue;
        }
        if !res.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            let err = res
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("request failed");
            anyhow::bail!("{}", err);
        }
        return Ok(res.get("payload").cloned().unwrap_or(serde_json::Value::Null));
    }
    anyhow::bail!("connection closed before response to {}", req.method)
}
