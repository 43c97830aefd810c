//! Menu replies: map a text command to canned image replies and render the option cards.
//!
//! Buttons resend their value as a new message turn, which is the only "state" the menu has.
//! The social-media submenu sends URLs rather than selectors, so pressing one of its buttons
//! lands in the not-understood reply.

use crate::activity::{CardAction, HeroCard, OutgoingAttachment, ReplyPayload};
use base64::Engine;
use std::path::{Path, PathBuf};

/// Bundled greeting image, relative to the resources directory.
pub const GREETING_IMAGE: &str = "hola_032.png";

pub const GREETING_TEXT: &str = "hola, espero que este teniendo un buen dia";
pub const SOCIAL_MEDIA_TEXT: &str = "Aqui se muestran las redes sociales";
pub const COMPANY_INFO_TEXT: &str = "A qui se muestra la informacion de la empresa";
pub const BUSINESS_HOURS_TEXT: &str = "A qui se muesta los horarios de atencion a clientes.";
pub const NOT_UNDERSTOOD_TEXT: &str = "lo siento no entiendo lo que dices";

const MENU_TEXT: &str = "Elije la opcion que desees consultar por favor";
const SUBMENU_TEXT: &str = "Selecciona la red social que desees consultar";

const SOCIAL_MEDIA_IMAGE_URL: &str =
    "https://www.telam.com.ar/advf/imagenes/2017/11/5a0c4c77de733_645x362.jpg";
const COMPANY_INFO_IMAGE_URL: &str = "https://e.rpp-noticias.io/normal/2016/09/26/111411_252455.png";
const BUSINESS_HOURS_IMAGE_URL: &str = "https://www.uneve.edu.mx/alumnos/PDF/horarios/horarios.jpg";

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("reading bundled resource {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Command selected by the exact text of a message turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSelector {
    /// "hola"
    Greeting,
    /// "1": social media
    Option1,
    /// "2": company info
    Option2,
    /// "3": business hours
    Option3,
    Unrecognized,
}

impl MenuSelector {
    /// Exact, case-sensitive match; no trimming.
    pub fn parse(text: Option<&str>) -> Self {
        match text {
            Some("hola") => MenuSelector::Greeting,
            Some("1") => MenuSelector::Option1,
            Some("2") => MenuSelector::Option2,
            Some("3") => MenuSelector::Option3,
            _ => MenuSelector::Unrecognized,
        }
    }
}

/// Entries of the social-media submenu. Their button values are literal links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmenuOption {
    Facebook,
    Twitter,
    Youtube,
}

impl SubmenuOption {
    pub const ALL: [SubmenuOption; 3] = [
        SubmenuOption::Facebook,
        SubmenuOption::Twitter,
        SubmenuOption::Youtube,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SubmenuOption::Facebook => "1. Facebook",
            SubmenuOption::Twitter => "2. Twitter",
            SubmenuOption::Youtube => "3. Youtube",
        }
    }

    pub fn value(self) -> &'static str {
        match self {
            SubmenuOption::Facebook => "www.facebok.com",
            SubmenuOption::Twitter => "www.Twitter.com",
            SubmenuOption::Youtube => "www.Youtube.com",
        }
    }
}

fn remote_image(name: &str, content_type: &str, url: &str) -> OutgoingAttachment {
    OutgoingAttachment {
        name: name.to_string(),
        content_type: content_type.to_string(),
        content_url: url.to_string(),
    }
}

pub fn social_media_image() -> OutgoingAttachment {
    remote_image("redes_sociales.jpg", "image/jpeg", SOCIAL_MEDIA_IMAGE_URL)
}

pub fn company_info_image() -> OutgoingAttachment {
    remote_image("informacion_empresa.png", "image/png", COMPANY_INFO_IMAGE_URL)
}

pub fn business_hours_image() -> OutgoingAttachment {
    remote_image("horarios.jpg", "image/jpeg", BUSINESS_HOURS_IMAGE_URL)
}

/// Top-level menu: one button per option, each resending its selector.
pub fn render_menu() -> ReplyPayload {
    ReplyPayload::card(HeroCard {
        title: String::new(),
        text: MENU_TEXT.to_string(),
        buttons: vec![
            CardAction::im_back("1. Redes sociales", "1"),
            CardAction::im_back("2. Informacion de la empresa", "2"),
            CardAction::im_back("3. Horarios", "3"),
        ],
    })
}

pub fn render_submenu() -> ReplyPayload {
    ReplyPayload::card(HeroCard {
        title: String::new(),
        text: SUBMENU_TEXT.to_string(),
        buttons: SubmenuOption::ALL
            .iter()
            .map(|o| CardAction::im_back(o.title(), o.value()))
            .collect(),
    })
}

fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

/// Maps message text to replies. Holds no per-turn state.
#[derive(Debug, Clone)]
pub struct MenuDispatcher {
    resources_dir: PathBuf,
}

impl MenuDispatcher {
    pub fn new(resources_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
        }
    }

    /// Replies for one message turn, in send order.
    pub async fn dispatch(&self, text: Option<&str>) -> Result<Vec<ReplyPayload>, MenuError> {
        let selector = MenuSelector::parse(text);
        log::debug!("menu: {:?} -> {:?}", text, selector);
        let replies = match selector {
            MenuSelector::Greeting => vec![
                ReplyPayload::with_media(GREETING_TEXT, self.inline_attachment(GREETING_IMAGE).await?),
                render_menu(),
            ],
            MenuSelector::Option1 => vec![
                render_submenu(),
                ReplyPayload::with_media(SOCIAL_MEDIA_TEXT, social_media_image()),
            ],
            MenuSelector::Option2 => {
                vec![ReplyPayload::with_media(COMPANY_INFO_TEXT, company_info_image())]
            }
            MenuSelector::Option3 => {
                vec![ReplyPayload::with_media(BUSINESS_HOURS_TEXT, business_hours_image())]
            }
            MenuSelector::Unrecognized => vec![ReplyPayload::text(NOT_UNDERSTOOD_TEXT)],
        };
        Ok(replies)
    }

    /// Read a bundled resource and embed its full contents as a base64 `data:` URI.
    pub async fn inline_attachment(&self, resource: &str) -> Result<OutgoingAttachment, MenuError> {
        let path = self.resources_dir.join(resource);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| MenuError::Resource {
                path: path.clone(),
                source,
            })?;
        let content_type = image_content_type(&path);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(OutgoingAttachment {
            name: resource.to_string(),
            content_type: content_type.to_string(),
            content_url: format!("data:{};base64,{}", content_type, encoded),
        })
    }
}
