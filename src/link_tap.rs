//! Double-click a link to open it in a background tab.
//!
//! A plain click on a navigation link is held back for
//! [`LINK_SINGLE_CLICK`](crate::constants::LINK_SINGLE_CLICK). A second click
//! inside that window turns the pair into a background-tab request instead
//! of a navigation.

use std::time::Instant;

use crate::protocol::Message;
use crate::timers::{TapTimer, TimerTable};

/// Class or id fragments that mark a link as a UI control.
const FUNCTIONAL_MARKERS: &[&str] = &[
    "button",
    "toggle",
    "btn",
    "favorite",
    "add-to",
    "remove-from",
    "like",
    "action",
];

/// The parts of an `<a>` element that decide how it is treated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    /// Resolved `href`.
    pub href: String,
    pub role: Option<String>,
    pub class_name: String,
    pub id: String,
    /// The `target` attribute.
    pub target: Option<String>,
    /// Contains an icon-font glyph (`.fa`, `.fas`, `[class*="fa-"]`, ...).
    pub has_icon: bool,
}

impl LinkInfo {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

/// Whether clicking `link` on the page at `page_url` navigates somewhere.
/// Script links, in-page anchors, API endpoints and links styled as controls
/// do not.
pub fn is_navigation_link(link: &LinkInfo, page_url: &str) -> bool {
    let href = link.href.trim();
    if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
        return false;
    }
    if is_same_page_anchor(href, page_url) {
        return false;
    }
    if ["/ajax-", "/api/", "?ajax="]
        .iter()
        .any(|marker| href.contains(marker))
    {
        return false;
    }
    if link
        .role
        .as_deref()
        .is_some_and(|role| role.eq_ignore_ascii_case("button"))
    {
        return false;
    }
    let class_and_id = format!("{} {}", link.class_name, link.id).to_ascii_lowercase();
    if FUNCTIONAL_MARKERS
        .iter()
        .any(|marker| class_and_id.contains(marker))
    {
        return false;
    }
    !link.has_icon
}

fn is_same_page_anchor(href: &str, page_url: &str) -> bool {
    if href.starts_with('#') {
        return true;
    }
    let Some((base, _fragment)) = href.split_once('#') else {
        return false;
    };
    let page = page_url.split('#').next().unwrap_or(page_url);
    base == page || base.trim_end_matches('/') == page.trim_end_matches('/')
}

/// How the click that just arrived is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDecision {
    /// Let the browser handle it.
    PassThrough,
    /// Cancel it.
    Swallow,
    /// Cancel it for now; [`LinkTapArbiter::tick`] may navigate later.
    Deferred,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub middle_button: bool,
}

impl ClickModifiers {
    fn opens_new_tab(&self) -> bool {
        self.ctrl || self.meta || self.middle_button
    }
}

#[derive(Debug, Default)]
pub struct LinkTapArbiter {
    timers: TimerTable<TapTimer>,
    pending: Option<String>,
    double_click: bool,
}

impl LinkTapArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click(
        &mut self,
        link: &LinkInfo,
        modifiers: ClickModifiers,
        page_url: &str,
        now: Instant,
    ) -> TapDecision {
        if !is_navigation_link(link, page_url) {
            return TapDecision::PassThrough;
        }
        let blank_target = link
            .target
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("_blank"));
        if modifiers.opens_new_tab() || blank_target {
            return TapDecision::PassThrough;
        }
        if self.double_click {
            return TapDecision::Swallow;
        }
        self.pending = Some(link.href.clone());
        self.timers
            .start(TapTimer::SingleClick, now, TapTimer::SingleClick.delay());
        TapDecision::Deferred
    }

    /// A double-click on `link`. Returns the message to send when the
    /// double-click was claimed.
    pub fn double_click(&mut self, link: &LinkInfo, page_url: &str, now: Instant) -> Option<Message> {
        if !is_navigation_link(link, page_url) {
            return None;
        }
        self.double_click = true;
        self.pending = None;
        self.timers.cancel(TapTimer::SingleClick);
        self.timers.start(
            TapTimer::DoubleClickReset,
            now,
            TapTimer::DoubleClickReset.delay(),
        );
        tracing::debug!(url = %link.href, "link double-clicked, opening in background");
        Some(Message::OpenInBackgroundTab {
            url: link.href.clone(),
        })
    }

    /// Fire due timers. Returns the URL to navigate to when a held single
    /// click was not followed by a second one.
    pub fn tick(&mut self, now: Instant) -> Option<String> {
        let mut navigate = None;
        while let Some(timer) = self.timers.pop_due(now) {
            match timer {
                TapTimer::SingleClick => {
                    if !self.double_click {
                        navigate = self.pending.take();
                    }
                }
                TapTimer::DoubleClickReset => self.double_click = false,
            }
        }
        navigate
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Forget any held click, as on page unload.
    pub fn dispose(&mut self) {
        self.timers.cancel_all();
        self.pending = None;
        self.double_click = false;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const PAGE: &str = "https://example.com/articles/1";

    #[test]
    fn classifies_navigation_links() {
        assert!(is_navigation_link(&LinkInfo::new("https://example.com/next"), PAGE));
        for href in [
            "javascript:void(0)",
            "#top",
            "https://example.com/articles/1#comments",
            "https://example.com/api/items",
            "https://example.com/ajax-load",
            "https://example.com/list?ajax=1",
            "",
        ] {
            assert!(!is_navigation_link(&LinkInfo::new(href), PAGE), "{href}");
        }
        let mut control = LinkInfo::new("https://example.com/x");
        control.class_name = "post-Like-count".into();
        assert!(!is_navigation_link(&control, PAGE));
        let mut role = LinkInfo::new("https://example.com/x");
        role.role = Some("button".into());
        assert!(!is_navigation_link(&role, PAGE));
        let mut icon = LinkInfo::new("https://example.com/x");
        icon.has_icon = true;
        assert!(!is_navigation_link(&icon, PAGE));
    }

    #[test]
    fn single_click_navigates_after_delay() {
        let t0 = Instant::now();
        let mut arbiter = LinkTapArbiter::new();
        let link = LinkInfo::new("https://example.com/next");
        assert_eq!(
            arbiter.click(&link, ClickModifiers::default(), PAGE, t0),
            TapDecision::Deferred
        );
        assert_eq!(arbiter.tick(t0 + Duration::from_millis(200)), None);
        assert_eq!(
            arbiter.tick(t0 + Duration::from_millis(300)),
            Some("https://example.com/next".to_string())
        );
    }

    #[test]
    fn double_click_opens_background_tab_instead() {
        let t0 = Instant::now();
        let mut arbiter = LinkTapArbiter::new();
        let link = LinkInfo::new("https://example.com/next");
        arbiter.click(&link, ClickModifiers::default(), PAGE, t0);
        let msg = arbiter.double_click(&link, PAGE, t0 + Duration::from_millis(120));
        assert_eq!(
            msg,
            Some(Message::OpenInBackgroundTab {
                url: "https://example.com/next".into()
            })
        );
        // the browser's second click event arrives while the flag is set
        assert_eq!(
            arbiter.click(
                &link,
                ClickModifiers::default(),
                PAGE,
                t0 + Duration::from_millis(130)
            ),
            TapDecision::Swallow
        );
        assert_eq!(arbiter.tick(t0 + Duration::from_secs(1)), None);
        // flag reset, clicks are held again
        assert_eq!(
            arbiter.click(&link, ClickModifiers::default(), PAGE, t0 + Duration::from_secs(1)),
            TapDecision::Deferred
        );
    }

    #[test]
    fn new_tab_clicks_pass_through() {
        let t0 = Instant::now();
        let mut arbiter = LinkTapArbiter::new();
        let mut link = LinkInfo::new("https://example.com/next");
        let ctrl = ClickModifiers {
            ctrl: true,
            ..ClickModifiers::default()
        };
        assert_eq!(arbiter.click(&link, ctrl, PAGE, t0), TapDecision::PassThrough);
        link.target = Some("_blank".into());
        assert_eq!(
            arbiter.click(&link, ClickModifiers::default(), PAGE, t0),
            TapDecision::PassThrough
        );
        assert_eq!(arbiter.next_deadline(), None);
    }
}
