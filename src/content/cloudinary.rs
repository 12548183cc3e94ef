use std::sync::OnceLock;

use regex::{Captures, Regex};

const HOST: &str = "res.cloudinary.com";
const UPLOAD_SEGMENT: &str = "/upload/";

/// Transformation prefixes Cloudinary accepts in the first path segment
/// after `/upload/`. A segment starting with one of these means the URL is
/// already transformed.
const TRANSFORM_PREFIXES: &[&str] = &[
    "a_", "ar_", "b_", "bo_", "c_", "dpr_", "e_", "f_", "fl_", "g_", "h_", "l_", "o_", "q_", "r_",
    "t_", "w_", "x_", "y_", "z_",
];

/// Injects automatic format/quality (and an optional width limit) into a
/// Cloudinary delivery URL. Anything else is returned unchanged.
pub fn optimize_url(url: &str, width: Option<u32>) -> String {
    if !url.contains(HOST) {
        return url.to_string();
    }
    let Some(pos) = url.find(UPLOAD_SEGMENT) else {
        return url.to_string();
    };

    let (head, rest) = url.split_at(pos + UPLOAD_SEGMENT.len());
    let first_segment = rest.split('/').next().unwrap_or_default();
    let already_transformed = first_segment
        .split(',')
        .any(|part| TRANSFORM_PREFIXES.iter().any(|p| part.starts_with(p)));
    if already_transformed {
        return url.to_string();
    }

    let transform = match width {
        Some(w) => format!("f_auto,q_auto,w_{},c_limit", w),
        None => "f_auto,q_auto".to_string(),
    };
    format!("{}{}/{}", head, transform, rest)
}

fn img_src_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(<img\b[^>]*?\bsrc=)(["'])([^"']*)(["'])"#).expect("valid img pattern")
    })
}

/// Rewrites every `<img src>` in an HTML fragment with [`optimize_url`].
pub fn optimize_html(html: &str, width: Option<u32>) -> String {
    img_src_pattern()
        .replace_all(html, |caps: &Captures| {
            format!(
                "{}{}{}{}",
                &caps[1],
                &caps[2],
                optimize_url(&caps[3], width),
                &caps[4]
            )
        })
        .into_owned()
}
