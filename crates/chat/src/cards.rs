use serde::Serialize;

pub const BOT_NAME: &str = "Harbor Point Service Desk";
pub const KNOWN_ISSUES_URL: &str = "https://docs.harborpoint.health/support/known-issues";
pub const FALLBACK_DISPLAY_NAME: &str = "Harbor Point";

pub const ACTION_EXISTING_TICKET: &str = "existing_ticket";
pub const ACTION_ERROR_INFO: &str = "error_info";
pub const ACTION_NEW_TICKET: &str = "new_ticket";

pub const TICKET_NUMBER_PROMPT: &str = "Please provide the existing ticket number.";
pub const ERROR_INFO_PROMPT: &str = "Please provide the error code or message.";
pub const UNAUTHORIZED_TEXT: &str =
    "Unauthorized access. This bot is only for Harbor Point Health accounts.";
pub const UNHANDLED_EVENT_TEXT: &str =
    "Received an unhandled event. If you need help, please try typing \"help\".";
pub const RETURN_TO_MENU_TEXT: &str = "Understood. Returning to main menu.";

/// One outbound response in the platform wire shape: either `{"text": ...}`
/// or a card navigation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Text(TextResponse),
    Card(CardPayload),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextResponse {
    pub text: String,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextResponse { text: text.into() })
    }

    /// Short human-readable summary for log lines.
    pub fn summary(&self) -> &str {
        match self {
            Self::Text(response) => &response.text,
            Self::Card(payload) => payload
                .navigations
                .first()
                .and_then(|navigation| navigation.push_card.header.as_ref())
                .map(|header| header.title.as_str())
                .unwrap_or("card"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardPayload {
    pub navigations: Vec<Navigation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Navigation {
    #[serde(rename = "pushCard")]
    pub push_card: Card,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<CardHeader>,
    pub sections: Vec<Section>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub widgets: Vec<Widget>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Widget {
    TextParagraph { text: String },
    ButtonList { buttons: Vec<Button> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    #[serde(rename = "onClick")]
    pub on_click: OnClick,
}

impl Button {
    pub fn action(label: impl Into<String>, function: impl Into<String>) -> Self {
        Self { text: label.into(), on_click: OnClick::Action { function: function.into() } }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self { text: label.into(), on_click: OnClick::OpenLink { url: url.into() } }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OnClick {
    Action { function: String },
    OpenLink { url: String },
}

pub struct CardBuilder {
    header: Option<CardHeader>,
    sections: Vec<Section>,
}

impl CardBuilder {
    pub fn new() -> Self {
        Self { header: None, sections: Vec::new() }
    }

    pub fn header(mut self, title: impl Into<String>, subtitle: Option<String>) -> Self {
        self.header = Some(CardHeader { title: title.into(), subtitle });
        self
    }

    pub fn section<F>(mut self, header: Option<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.sections.push(Section { header, widgets: builder.build() });
        self
    }

    pub fn build(self) -> ChatResponse {
        ChatResponse::Card(CardPayload {
            navigations: vec![Navigation {
                push_card: Card { header: self.header, sections: self.sections },
            }],
        })
    }
}

impl Default for CardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    widgets: Vec<Widget>,
}

impl SectionBuilder {
    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.widgets.push(Widget::TextParagraph { text: text.into() });
        self
    }

    pub fn buttons(&mut self, buttons: Vec<Button>) -> &mut Self {
        self.widgets.push(Widget::ButtonList { buttons });
        self
    }

    fn build(self) -> Vec<Widget> {
        self.widgets
    }
}

/// The static support menu, personalized with the sender's display name.
pub fn static_menu(display_name: &str) -> ChatResponse {
    CardBuilder::new()
        .header(BOT_NAME, Some(format!("Welcome, {display_name}")))
        .section(Some("Support Menu (Available 24/7)".to_owned()), |section| {
            section
                .paragraph("Choose an option below or type \"help\" for assistance.")
                .buttons(vec![
                    Button::action("Existing Ticket", ACTION_EXISTING_TICKET),
                    Button::link("Known Issues", KNOWN_ISSUES_URL),
                ])
                .buttons(vec![
                    Button::action("Error Code/Message", ACTION_ERROR_INFO),
                    Button::action("Open New Ticket", ACTION_NEW_TICKET),
                ]);
        })
        .build()
}

/// Fixed template asking for everything a new ticket needs.
pub fn new_ticket_prompt() -> String {
    ["Please provide the following information to create a new ticket:",
        "URL link:",
        "Affected record ID:",
        "Username:",
        "Steps to recreate the issue or a screenshot:",
        "Approximate time the issue occurred:"]
    .join("\n")
}

pub fn known_issues_text() -> ChatResponse {
    ChatResponse::text(format!("Here is the link to Known Issues: {KNOWN_ISSUES_URL}"))
}

/// Error card returned when request handling itself fails; the correlation
/// id lets a user report the failure without sharing internals.
pub fn error_card(detail: &str, correlation_id: &str) -> ChatResponse {
    CardBuilder::new()
        .header("Error", Some("An internal error occurred".to_owned()))
        .section(None, |section| {
            section
                .paragraph(format!("Error: {detail}"))
                .paragraph(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}
