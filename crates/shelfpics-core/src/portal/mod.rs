//! Vendor portal workflow: logging in and turning catalog records into
//! downloaded picture archives.
//!
//! Everything here talks to the browser through [`PortalDriver`], so the
//! workflow runs the same against Chrome and against the scripted driver
//! used in tests.

mod auth;
mod driver;
mod resolver;

#[cfg(test)]
pub(crate) mod fake;

pub use auth::{AuthState, Authenticator};
pub use driver::PortalDriver;
pub use resolver::{ItemResolver, PortalOptions, ResolvedItem, model_id_from_href};

/// Text shown on the login page before signing in ("Sign in")
pub const LOGIN_FORM_MARKER: &str = "Вход";
/// Text shown only to a signed-in user ("Sign out")
pub const LOGGED_IN_MARKER: &str = "Выйти";

/// Form field and element locators of the portal pages
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const NAME: &str = "name";
    pub const SKU: &str = "sku_mf";
    pub const BRAND: &str = "brand_id";
    pub const PRODUCT_TYPE: &str = "type";

    /// Each search hit in the model list
    pub const RESULTS: &str = r#"//*[@id="models_list"]/div[1]/div"#;
    /// Link of the first search hit
    pub const FIRST_RESULT_LINK: &str = r#"//*[@id="models_list"]/div[1]/div[1]/a"#;
}
