//! Welcome banner and usage text

/// Crate version reported by `version` and the banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const LOGO: &str = r" _____            _  _   _____
|  __ \          | |(_) / ____|
| |__) | ___   __| | _ | (___    ___   ___  _ __
|  _  / / _ \ / _` || | \___ \  / _ \ / _ \| '_ \
| | \ \|  __/| (_| || | ____) ||  __/|  __/| | | |
|_|  \_\\___| \__,_||_||_____/  \___| \___||_| |_|";

const ENDPOINTS: &str = "Available Endpoints:
 - /info
 - /info/<info_section>
 - /<db>
 - /<db>/<key>
 - /<db>/<key>/<index>
 - /<db>/<key>/<field>";

/// Logo followed by `rediseen <version>`.
pub fn header() -> String {
    format!("{}\nrediseen {}", LOGO, VERSION)
}

/// Plain-text body served at `/`.
pub fn welcome() -> String {
    format!("{}\n\n{}", header(), ENDPOINTS)
}
