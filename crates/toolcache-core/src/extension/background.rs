//! Background context: message handlers, install hook and context menu.

use super::detect::is_pdf_url;
use super::menu::ContextMenu;
use super::protocol::{Message, MessageResponse, MessageSender};
use super::recent::RecentTools;
use crate::config::{ExtensionConfig, ExtensionSettings};
use crate::error::Result;
use crate::storage::{get_json, set_json, LocalStorage};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};
use url::Url;

/// Opens a new browser tab. Implemented by the host.
#[async_trait::async_trait]
pub trait TabOpener: Send + Sync {
    async fn open_tab(&self, url: Url) -> Result<()>;
}

/// A handler's answer to one message.
///
/// A handler that needs to await anything must return `Deferred`; the channel
/// then stays open until the future resolves. There is no way to return
/// without a reply.
pub enum Reply {
    Immediate(MessageResponse),
    Deferred(BoxFuture<'static, MessageResponse>),
}

impl Reply {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = MessageResponse> + Send + 'static,
    {
        Reply::Deferred(Box::pin(future))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Reply::Deferred(_))
    }

    /// Wait for the response.
    pub async fn resolve(self) -> MessageResponse {
        match self {
            Reply::Immediate(response) => response,
            Reply::Deferred(future) => future.await,
        }
    }
}

/// Dispatches raw messages from other contexts.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, message: &Value, sender: &MessageSender) -> Reply;
}

struct Inner {
    settings: ExtensionSettings,
    storage: Arc<dyn LocalStorage>,
    recent: RecentTools,
    tabs: Arc<dyn TabOpener>,
    menu: OnceLock<ContextMenu>,
}

/// The extension's background context.
#[derive(Clone)]
pub struct Background {
    inner: Arc<Inner>,
}

impl Background {
    pub fn new(
        settings: ExtensionSettings,
        storage: Arc<dyn LocalStorage>,
        tabs: Arc<dyn TabOpener>,
    ) -> Self {
        let recent = RecentTools::new(storage.clone());
        Self {
            inner: Arc::new(Inner {
                settings,
                storage,
                recent,
                tabs,
                menu: OnceLock::new(),
            }),
        }
    }

    pub fn settings(&self) -> &ExtensionSettings {
        &self.inner.settings
    }

    pub fn recent(&self) -> &RecentTools {
        &self.inner.recent
    }

    /// Context menu, once installed.
    pub fn menu(&self) -> Option<&ContextMenu> {
        self.inner.menu.get()
    }

    /// Install hook: record the install date, initialize the recent list and
    /// build the context menu. Safe to call again on update.
    pub async fn on_installed(&self) -> Result<()> {
        let storage = self.inner.storage.as_ref();

        if storage.get(ExtensionConfig::INSTALL_DATE_KEY).await?.is_none() {
            let now = Utc::now();
            set_json(storage, ExtensionConfig::INSTALL_DATE_KEY, &now).await?;
            info!("Extension installed at {}", now.to_rfc3339());
        }

        if self.inner.recent.ensure_initialized().await? {
            debug!("Initialized empty recent tool list");
        }

        let menu = self
            .inner
            .menu
            .get_or_init(|| ContextMenu::build(&self.inner.settings.context_menu));
        debug!("Context menu has {} items", menu.items().len());
        Ok(())
    }

    pub async fn install_date(&self) -> Result<Option<DateTime<Utc>>> {
        get_json(self.inner.storage.as_ref(), ExtensionConfig::INSTALL_DATE_KEY).await
    }

    /// Open a tool page in a new tab.
    pub async fn open_tool(&self, tool_id: &str) -> Result<()> {
        let url = self.inner.settings.tool_url(tool_id)?;
        debug!("Opening tool {} at {}", tool_id, url);
        self.inner.tabs.open_tab(url).await
    }

    /// Handle a context-menu click. Returns the tool opened, if any.
    ///
    /// Unknown items and clicks before install are logged and ignored.
    pub async fn on_menu_click(&self, menu_item_id: &str) -> Result<Option<String>> {
        let Some(menu) = self.menu() else {
            warn!("Context menu clicked before install: {}", menu_item_id);
            return Ok(None);
        };
        let Some(tool_id) = menu.tool_for(menu_item_id).map(str::to_string) else {
            warn!("Unknown context menu item: {}", menu_item_id);
            return Ok(None);
        };
        self.open_tool(&tool_id).await?;
        Ok(Some(tool_id))
    }

    fn check_tool_id(&self, tool_id: &str) -> Result<()> {
        self.inner.settings.tool_url(tool_id).map(|_| ())
    }
}

impl MessageHandler for Background {
    fn handle(&self, raw: &Value, sender: &MessageSender) -> Reply {
        let message = match Message::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Rejected message from {:?}: {}", sender.context, e);
                return Reply::Immediate(e.into());
            }
        };
        debug!("{} from {:?}", message.kind(), sender.context);

        match message {
            Message::GetRecentTools => {
                let recent = self.inner.recent.clone();
                Reply::deferred(async move {
                    match recent.list().await {
                        Ok(recent_tools) => MessageResponse::RecentTools { recent_tools },
                        Err(e) => e.into(),
                    }
                })
            }
            Message::AddRecentTool { tool_id } => {
                if let Err(e) = self.check_tool_id(&tool_id) {
                    return Reply::Immediate(e.into());
                }
                let recent = self.inner.recent.clone();
                Reply::deferred(async move {
                    match recent.add(&tool_id).await {
                        Ok(recent_tools) => MessageResponse::RecentTools { recent_tools },
                        Err(e) => e.into(),
                    }
                })
            }
            Message::OpenTool { tool_id } => {
                let background = self.clone();
                Reply::deferred(async move {
                    match background.open_tool(&tool_id).await {
                        Ok(()) => MessageResponse::Ack { success: true },
                        Err(e) => e.into(),
                    }
                })
            }
            Message::CheckPdf => {
                let is_pdf = sender.tab_url.as_ref().is_some_and(is_pdf_url);
                Reply::Immediate(MessageResponse::PdfCheck { is_pdf })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::RecordingTabs;
    use serde_json::json;

    fn background() -> (Arc<RecordingTabs>, Background) {
        let tabs = Arc::new(RecordingTabs::default());
        let background = Background::new(
            ExtensionSettings::default(),
            Arc::new(MemoryStorage::new()),
            tabs.clone(),
        );
        (tabs, background)
    }

    #[tokio::test]
    async fn test_storage_handlers_are_deferred() {
        let (_tabs, background) = background();
        let popup = MessageSender::popup();

        let reply = background.handle(&json!({"type": "GET_RECENT_TOOLS"}), &popup);
        assert!(reply.is_deferred());
        assert_eq!(
            reply.resolve().await,
            MessageResponse::RecentTools {
                recent_tools: vec![]
            }
        );

        let reply = background.handle(&json!({"type": "ADD_RECENT_TOOL", "toolId": "a"}), &popup);
        assert!(reply.is_deferred());
        reply.resolve().await;
    }

    #[tokio::test]
    async fn test_recent_sequence() {
        let (_tabs, background) = background();
        let popup = MessageSender::popup();

        let mut last = None;
        for id in ["a", "b", "c", "a"] {
            let message = json!({"type": "ADD_RECENT_TOOL", "toolId": id});
            last = Some(background.handle(&message, &popup).resolve().await);
        }

        assert_eq!(
            last.unwrap(),
            MessageResponse::RecentTools {
                recent_tools: vec!["a".into(), "c".into(), "b".into()]
            }
        );
    }

    #[tokio::test]
    async fn test_check_pdf_uses_sender_url() {
        let (_tabs, background) = background();
        let message = json!({"type": "CHECK_PDF"});

        let pdf_tab = MessageSender::content_script(Url::parse("https://a.example/x.pdf").unwrap());
        let reply = background.handle(&message, &pdf_tab);
        assert!(!reply.is_deferred());
        assert_eq!(reply.resolve().await, MessageResponse::PdfCheck { is_pdf: true });

        let reply = background.handle(&message, &MessageSender::popup());
        assert_eq!(reply.resolve().await, MessageResponse::PdfCheck { is_pdf: false });
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_messages_get_errors() {
        let (_tabs, background) = background();
        let popup = MessageSender::popup();

        let reply = background.handle(&json!({"type": "PING"}), &popup);
        assert!(!reply.is_deferred());
        assert!(reply.resolve().await.is_error());

        let reply = background.handle(&json!({"type": "ADD_RECENT_TOOL", "toolId": ""}), &popup);
        assert!(reply.resolve().await.is_error());
        assert!(background.recent().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_tool_does_not_touch_recent_list() {
        let (tabs, background) = background();
        let sender = MessageSender::content_script(Url::parse("https://a.example/").unwrap());

        let reply = background.handle(&json!({"type": "OPEN_TOOL", "toolId": "pdf-merge"}), &sender);
        assert_eq!(reply.resolve().await, MessageResponse::Ack { success: true });

        assert_eq!(
            tabs.opened(),
            vec![Url::parse("http://localhost:4321/tools/pdf-merge").unwrap()]
        );
        assert!(background.recent().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_on_installed_is_idempotent() {
        let (_tabs, background) = background();
        assert!(background.menu().is_none());

        background.on_installed().await.unwrap();
        let first = background.install_date().await.unwrap().unwrap();
        background.recent().add("pdf-merge").await.unwrap();

        background.on_installed().await.unwrap();
        assert_eq!(background.install_date().await.unwrap().unwrap(), first);
        assert_eq!(background.recent().list().await.unwrap(), vec!["pdf-merge"]);
        assert!(background.menu().is_some());
    }

    #[tokio::test]
    async fn test_menu_click() {
        let (tabs, background) = background();
        assert_eq!(background.on_menu_click("merge-pdf").await.unwrap(), None);

        background.on_installed().await.unwrap();
        assert_eq!(
            background.on_menu_click("compress-image").await.unwrap(),
            Some("image-compress".to_string())
        );
        assert_eq!(background.on_menu_click("nope").await.unwrap(), None);
        assert_eq!(tabs.opened().len(), 1);
    }
}
