//! Configuration section definitions.
//!
//! | Section   | Purpose                                          |
//! |-----------|--------------------------------------------------|
//! | `[build]` | Source/output paths, fingerprint length, markup  |
//! | `[css]`   | Vendor-prefix targets, preprocessor command      |
//! | `[js]`    | Minifier options and global defines              |
//! | `[html]`  | Markup minification                              |

mod build;
mod css;
mod html;
mod js;

pub use build::BuildConfig;
pub use css::CssConfig;
pub use html::HtmlConfig;
pub use js::JsConfig;
