//! Browser automation driver abstraction.
//!
//! Generated step code talks to a real browser; the compiler itself only
//! needs the same small set of primitives, so they are modelled here as a
//! trait with two implementations:
//! - `SeleniumScript` renders each primitive as a line of Selenium Python
//! - `RecordingDriver` records calls for dry runs and tests

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::compiler::types::ActionSpec;

/// Element id of the login form's email field
pub const LOGIN_IDENTITY_FIELD: &str = "email";

/// Element id of the login form's password field
pub const LOGIN_SECRET_FIELD: &str = "password";

/// Element id of the login form's submit button
pub const LOGIN_SUBMIT_FIELD: &str = "login-button";

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("no element matches {0}")]
    ElementNotFound(Locator),

    #[error("element {0} is not displayed")]
    NotVisible(Locator),

    #[error("driver has been released")]
    Released,

    #[error("browser launch failed: {0}")]
    Launch(String),
}

/// How an element is looked up
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// By element id
    Field(String),
    /// By exact visible text
    Text(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Field(id) => write!(f, "id={}", id),
            Locator::Text(text) => write!(f, "text={:?}", text),
        }
    }
}

/// A handle to an element found by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub locator: Locator,
}

/// Browser primitives used by step actions
pub trait BrowserDriver {
    fn navigate(&mut self, url: &str) -> DriverResult<()>;

    fn find_by_field(&mut self, id: &str) -> DriverResult<ElementRef>;

    fn find_by_text(&mut self, text: &str) -> DriverResult<ElementRef>;

    fn set_text(&mut self, element: &ElementRef, text: &str) -> DriverResult<()>;

    fn click(&mut self, element: &ElementRef) -> DriverResult<()>;

    fn is_visible(&mut self, element: &ElementRef) -> DriverResult<bool>;

    /// Close the browser; further calls fail with [`DriverError::Released`]
    fn release(&mut self) -> DriverResult<()>;
}

/// Starts browsers
pub trait DriverLauncher {
    type Driver: BrowserDriver;

    fn launch(&self) -> DriverResult<Self::Driver>;
}

/// Lazily launched, single-instance driver handle.
///
/// The first [`DriverSlot::get`] launches a browser; later calls reuse it
/// until [`DriverSlot::release`] closes and clears it.
pub struct DriverSlot<L: DriverLauncher> {
    launcher: L,
    handle: Option<L::Driver>,
}

impl<L: DriverLauncher> DriverSlot<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            handle: None,
        }
    }

    pub fn get(&mut self) -> DriverResult<&mut L::Driver> {
        if self.handle.is_none() {
            self.handle = Some(self.launcher.launch()?);
        }
        self.handle.as_mut().ok_or(DriverError::Released)
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Release the browser if one was launched
    pub fn release(&mut self) -> DriverResult<()> {
        match self.handle.take() {
            Some(mut driver) => driver.release(),
            None => Ok(()),
        }
    }
}

impl ActionSpec {
    /// Drive a browser through this action
    pub fn perform<D: BrowserDriver + ?Sized>(&self, driver: &mut D) -> DriverResult<()> {
        match self {
            ActionSpec::Navigate { target } => driver.navigate(target),
            ActionSpec::Authenticate { identity, secret } => {
                let email = driver.find_by_field(LOGIN_IDENTITY_FIELD)?;
                driver.set_text(&email, identity)?;
                let password = driver.find_by_field(LOGIN_SECRET_FIELD)?;
                driver.set_text(&password, secret)?;
                let submit = driver.find_by_field(LOGIN_SUBMIT_FIELD)?;
                driver.click(&submit)
            }
            ActionSpec::Click { label } => {
                let element = driver.find_by_text(label)?;
                driver.click(&element)
            }
            ActionSpec::AssertVisible { label } => {
                let element = driver.find_by_text(label)?;
                if driver.is_visible(&element)? {
                    Ok(())
                } else {
                    Err(DriverError::NotVisible(element.locator))
                }
            }
            ActionSpec::NoOp => Ok(()),
        }
    }
}

// ============================================================================
// Selenium script renderer
// ============================================================================

/// Renders driver primitives as Selenium Python statements.
///
/// The rendered code expects a local `driver` bound to a WebDriver.
#[derive(Debug, Default, Clone)]
pub struct SeleniumScript {
    lines: Vec<String>,
    released: bool,
}

impl SeleniumScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a single action
    pub fn render(action: &ActionSpec) -> Vec<String> {
        let mut script = Self::new();
        // Rendering never fails: lookups and visibility checks are emitted, not run
        let _ = action.perform(&mut script);
        script.into_lines()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn find_expr(locator: &Locator) -> String {
        match locator {
            Locator::Field(id) => format!("driver.find_element(By.ID, {})", py_str(id)),
            Locator::Text(text) => format!("driver.find_element(By.XPATH, {})", py_str(&xpath_text(text))),
        }
    }

    fn push(&mut self, line: String) -> DriverResult<()> {
        if self.released {
            return Err(DriverError::Released);
        }
        self.lines.push(line);
        Ok(())
    }
}

impl BrowserDriver for SeleniumScript {
    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.push(format!("driver.get({})", py_str(url)))
    }

    fn find_by_field(&mut self, id: &str) -> DriverResult<ElementRef> {
        Ok(ElementRef {
            locator: Locator::Field(id.to_string()),
        })
    }

    fn find_by_text(&mut self, text: &str) -> DriverResult<ElementRef> {
        Ok(ElementRef {
            locator: Locator::Text(text.to_string()),
        })
    }

    fn set_text(&mut self, element: &ElementRef, text: &str) -> DriverResult<()> {
        self.push(format!("{}.send_keys({})", Self::find_expr(&element.locator), py_str(text)))
    }

    fn click(&mut self, element: &ElementRef) -> DriverResult<()> {
        self.push(format!("{}.click()", Self::find_expr(&element.locator)))
    }

    fn is_visible(&mut self, element: &ElementRef) -> DriverResult<bool> {
        self.push(format!("element = {}", Self::find_expr(&element.locator)))?;
        self.push("assert element.is_displayed(), 'Element not displayed'".to_string())?;
        Ok(true)
    }

    fn release(&mut self) -> DriverResult<()> {
        self.push("driver.quit()".to_string())?;
        self.released = true;
        Ok(())
    }
}

/// Quote a string as a Python literal, single-quoted unless only double
/// quotes avoid escaping
pub fn py_str(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// XPath matching any element whose text equals `text`
fn xpath_text(text: &str) -> String {
    if !text.contains('\'') {
        format!("//*[text()='{}']", text)
    } else if !text.contains('"') {
        format!("//*[text()=\"{}\"]", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("//*[text()=concat({})]", parts.join(", \"'\", "))
    }
}

// ============================================================================
// Recording driver
// ============================================================================

/// A primitive call observed by [`RecordingDriver`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DriverCall {
    Navigate { url: String },
    Find { locator: Locator },
    SetText { locator: Locator, text: String },
    Click { locator: Locator },
    IsVisible { locator: Locator },
    Release,
}

impl fmt::Display for DriverCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverCall::Navigate { url } => write!(f, "navigate {}", url),
            DriverCall::Find { locator } => write!(f, "find {}", locator),
            DriverCall::SetText { locator, text } => write!(f, "set_text {} {:?}", locator, text),
            DriverCall::Click { locator } => write!(f, "click {}", locator),
            DriverCall::IsVisible { locator } => write!(f, "is_visible {}", locator),
            DriverCall::Release => f.write_str("release"),
        }
    }
}

/// In-memory driver that records every call.
///
/// Elements are always found; texts listed as hidden report not visible.
#[derive(Debug, Default, Clone)]
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    hidden: Vec<String>,
    released: bool,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report elements with this text as not displayed
    pub fn hide_text(mut self, text: impl Into<String>) -> Self {
        self.hidden.push(text.into());
        self
    }

    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DriverCall> {
        std::mem::take(&mut self.calls)
    }

    fn record(&mut self, call: DriverCall) -> DriverResult<()> {
        if self.released {
            return Err(DriverError::Released);
        }
        self.calls.push(call);
        Ok(())
    }

    fn found(&mut self, locator: Locator) -> DriverResult<ElementRef> {
        self.record(DriverCall::Find {
            locator: locator.clone(),
        })?;
        Ok(ElementRef { locator })
    }
}

impl BrowserDriver for RecordingDriver {
    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.record(DriverCall::Navigate { url: url.to_string() })
    }

    fn find_by_field(&mut self, id: &str) -> DriverResult<ElementRef> {
        self.found(Locator::Field(id.to_string()))
    }

    fn find_by_text(&mut self, text: &str) -> DriverResult<ElementRef> {
        self.found(Locator::Text(text.to_string()))
    }

    fn set_text(&mut self, element: &ElementRef, text: &str) -> DriverResult<()> {
        self.record(DriverCall::SetText {
            locator: element.locator.clone(),
            text: text.to_string(),
        })
    }

    fn click(&mut self, element: &ElementRef) -> DriverResult<()> {
        self.record(DriverCall::Click {
            locator: element.locator.clone(),
        })
    }

    fn is_visible(&mut self, element: &ElementRef) -> DriverResult<bool> {
        self.record(DriverCall::IsVisible {
            locator: element.locator.clone(),
        })?;
        Ok(match &element.locator {
            Locator::Text(text) => !self.hidden.iter().any(|h| h == text),
            Locator::Field(_) => true,
        })
    }

    fn release(&mut self) -> DriverResult<()> {
        self.record(DriverCall::Release)?;
        self.released = true;
        Ok(())
    }
}

/// Launches fresh [`RecordingDriver`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordingLauncher;

impl DriverLauncher for RecordingLauncher {
    type Driver = RecordingDriver;

    fn launch(&self) -> DriverResult<RecordingDriver> {
        Ok(RecordingDriver::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn login() -> ActionSpec {
        ActionSpec::Authenticate {
            identity: "admin@example.com".to_string(),
            secret: "12345".to_string(),
        }
    }

    #[test]
    fn test_render_login() {
        assert_eq!(
            SeleniumScript::render(&login()),
            vec![
                "driver.find_element(By.ID, 'email').send_keys('admin@example.com')",
                "driver.find_element(By.ID, 'password').send_keys('12345')",
                "driver.find_element(By.ID, 'login-button').click()",
            ]
        );
    }

    #[test]
    fn test_render_assert_visible() {
        let action = ActionSpec::AssertVisible { label: "Welcome".to_string() };
        assert_eq!(
            SeleniumScript::render(&action),
            vec![
                "element = driver.find_element(By.XPATH, \"//*[text()='Welcome']\")",
                "assert element.is_displayed(), 'Element not displayed'",
            ]
        );
    }

    #[test]
    fn test_render_navigate_and_noop() {
        let action = ActionSpec::Navigate { target: "localhost:3000".to_string() };
        assert_eq!(SeleniumScript::render(&action), vec!["driver.get('localhost:3000')"]);
        assert!(SeleniumScript::render(&ActionSpec::NoOp).is_empty());
    }

    #[test]
    fn test_xpath_quotes() {
        assert_eq!(xpath_text("Save"), "//*[text()='Save']");
        assert_eq!(xpath_text("It's"), "//*[text()=\"It's\"]");
        assert_eq!(
            xpath_text("It's \"x\""),
            "//*[text()=concat('It', \"'\", 's \"x\"')]"
        );
    }

    #[test]
    fn test_py_str_escapes() {
        assert_eq!(py_str("plain"), "'plain'");
        assert_eq!(py_str("it's"), "\"it's\"");
        assert_eq!(py_str("it's \"x\""), "'it\\'s \"x\"'");
        assert_eq!(py_str("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_recording_login_sequence() {
        let mut driver = RecordingDriver::new();
        login().perform(&mut driver).unwrap();

        let field = |id: &str| Locator::Field(id.to_string());
        assert_eq!(
            driver.calls(),
            &[
                DriverCall::Find { locator: field("email") },
                DriverCall::SetText { locator: field("email"), text: "admin@example.com".to_string() },
                DriverCall::Find { locator: field("password") },
                DriverCall::SetText { locator: field("password"), text: "12345".to_string() },
                DriverCall::Find { locator: field("login-button") },
                DriverCall::Click { locator: field("login-button") },
            ]
        );
    }

    #[test]
    fn test_assert_visible_fails_when_hidden() {
        let mut driver = RecordingDriver::new().hide_text("Welcome");
        let action = ActionSpec::AssertVisible { label: "Welcome".to_string() };
        let err = action.perform(&mut driver).unwrap_err();
        assert_eq!(err, DriverError::NotVisible(Locator::Text("Welcome".to_string())));
    }

    #[test]
    fn test_slot_launches_once_and_releases() {
        let mut slot = DriverSlot::new(RecordingLauncher);
        assert!(!slot.is_active());

        slot.get().unwrap().navigate("http://a").unwrap();
        slot.get().unwrap().navigate("http://b").unwrap();
        assert_eq!(slot.get().unwrap().calls().len(), 2);

        slot.release().unwrap();
        assert!(!slot.is_active());

        // A fresh browser after release
        assert!(slot.get().unwrap().calls().is_empty());
    }

    #[test]
    fn test_released_driver_rejects_calls() {
        let mut driver = RecordingDriver::new();
        driver.release().unwrap();
        assert_eq!(driver.navigate("http://a"), Err(DriverError::Released));
    }
}
