//! yt-dlp argument vector for one job.

use crate::job::options::non_empty;
use crate::job::{DownloadOptions, ALL_SUBTITLE_LANGS};

/// Best video + best audio merged, else the best single stream.
pub const DEFAULT_FORMAT: &str = "bestvideo+bestaudio/best";

/// Audio-only selector used by the `audio` preset and `audio_only`.
pub const AUDIO_FORMAT: &str = "bestaudio/best";

/// Sent when the caller does not supply a user agent; never blank.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser used for cookie extraction when none is named.
pub const DEFAULT_COOKIE_BROWSER: &str = "chrome";

/// Browser-mimicking headers attached to every request.
pub const BROWSER_HEADERS: &[&str] = &[
    "Accept-Language:en-US,en;q=0.9",
    "Accept:text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    "DNT:1",
    "Sec-Fetch-Mode:navigate",
];

/// Resolved `--format` value and whether audio should be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChoice {
    pub selector: String,
    pub extract_audio: bool,
}

/// Maps the `format` option (preset or raw selector) and `audio_only` to a selector.
pub fn format_choice(options: &DownloadOptions) -> FormatChoice {
    let requested = non_empty(&options.format);
    if options.audio_only || requested.is_some_and(|f| f.eq_ignore_ascii_case("audio")) {
        let selector = match requested {
            Some(f) if !f.eq_ignore_ascii_case("audio") && !f.eq_ignore_ascii_case("best") => {
                f.to_string()
            }
            _ => AUDIO_FORMAT.to_string(),
        };
        return FormatChoice {
            selector,
            extract_audio: true,
        };
    }
    let selector = match requested {
        None => DEFAULT_FORMAT.to_string(),
        Some(f) if f.eq_ignore_ascii_case("best") => DEFAULT_FORMAT.to_string(),
        Some(f) => match height_preset(f) {
            Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
            None => f.to_string(),
        },
    };
    FormatChoice {
        selector,
        extract_audio: false,
    }
}

/// `1080p` -> 1080.
fn height_preset(format: &str) -> Option<u32> {
    let digits = format
        .strip_suffix('p')
        .or_else(|| format.strip_suffix('P'))?;
    digits.parse().ok().filter(|h| *h > 0)
}

fn push(args: &mut Vec<String>, flag: &str) {
    args.push(flag.to_string());
}

fn push_value(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

/// Builds the full argument vector for `url`. The URL is always last.
pub fn build_args(url: &str, options: &DownloadOptions) -> Vec<String> {
    let mut args = Vec::with_capacity(48);

    let format = format_choice(options);
    push_value(&mut args, "--format", format.selector);
    if format.extract_audio {
        push(&mut args, "--extract-audio");
    } else if let Some(container) = non_empty(&options.video_format) {
        push_value(&mut args, "--merge-output-format", container);
    }

    push_value(
        &mut args,
        "--output",
        options.output_path().to_string_lossy().into_owned(),
    );
    push(&mut args, "--no-overwrites");

    if options.use_cookies {
        let browser = non_empty(&options.browser_name).unwrap_or(DEFAULT_COOKIE_BROWSER);
        push_value(&mut args, "--cookies-from-browser", browser);
    }
    let user_agent = non_empty(&options.user_agent).unwrap_or(DEFAULT_USER_AGENT);
    push_value(&mut args, "--user-agent", user_agent);
    if let Some(proxy) = non_empty(&options.proxy_url) {
        push_value(&mut args, "--proxy", proxy);
    }
    if let Some(rate) = non_empty(&options.rate_limit) {
        push_value(&mut args, "--limit-rate", rate);
    }
    for header in BROWSER_HEADERS {
        push_value(&mut args, "--add-header", *header);
    }
    push_value(&mut args, "--referer", url);
    push(&mut args, "--no-check-certificates");

    let langs: Vec<&str> = options
        .subtitle_langs
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let langs = if langs.is_empty() {
        ALL_SUBTITLE_LANGS.to_string()
    } else {
        langs.join(",")
    };
    push_value(&mut args, "--sub-langs", langs);
    if let Some(sub_format) = non_empty(&options.subtitle_format) {
        push_value(&mut args, "--convert-subs", sub_format);
    }
    if options.download_subs || options.external_sub_files {
        push(&mut args, "--write-subs");
    }
    if options.download_auto_subs {
        push(&mut args, "--write-auto-subs");
    }
    if options.embed_subtitles {
        push(&mut args, "--embed-subs");
    }

    if options.no_playlist {
        push(&mut args, "--no-playlist");
    }
    if options.playlist_start > 0 {
        push_value(&mut args, "--playlist-start", options.playlist_start.to_string());
    }
    if options.playlist_end > 0 {
        push_value(&mut args, "--playlist-end", options.playlist_end.to_string());
    }

    push(&mut args, "--no-abort-on-error");
    push(&mut args, "--ignore-errors");

    if let Some(target) = non_empty(&options.impersonate) {
        push_value(&mut args, "--impersonate", target);
    }

    // One progress line per update, no carriage-return redraws.
    push(&mut args, "--newline");
    push(&mut args, "--progress");

    args.push(url.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const URL: &str = "https://www.youtube.com/watch?v=abc";

    fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    fn has(args: &[String], flag: &str) -> bool {
        args.iter().any(|a| a == flag)
    }

    #[test]
    fn defaults() {
        let args = build_args(URL, &DownloadOptions::default());
        assert_eq!(args.last().map(String::as_str), Some(URL));
        assert_eq!(value_of(&args, "--format"), Some(DEFAULT_FORMAT));
        assert_eq!(value_of(&args, "--user-agent"), Some(DEFAULT_USER_AGENT));
        assert_eq!(value_of(&args, "--referer"), Some(URL));
        assert_eq!(value_of(&args, "--sub-langs"), Some("all"));
        for flag in [
            "--no-overwrites",
            "--no-check-certificates",
            "--no-abort-on-error",
            "--ignore-errors",
            "--newline",
            "--progress",
        ] {
            assert!(has(&args, flag), "missing {flag}");
        }
        for flag in [
            "--cookies-from-browser",
            "--proxy",
            "--limit-rate",
            "--convert-subs",
            "--write-subs",
            "--write-auto-subs",
            "--embed-subs",
            "--impersonate",
            "--extract-audio",
            "--no-playlist",
        ] {
            assert!(!has(&args, flag), "unexpected {flag}");
        }
        assert_eq!(
            args.iter().filter(|a| *a == "--add-header").count(),
            BROWSER_HEADERS.len()
        );
    }

    #[test]
    fn output_path_joins_dir_and_template() {
        let opts = DownloadOptions {
            output_dir: PathBuf::from("/tmp/media"),
            output_template: "%(title)s.%(ext)s".to_string(),
            ..Default::default()
        };
        let args = build_args(URL, &opts);
        assert_eq!(value_of(&args, "--output"), Some("/tmp/media/%(title)s.%(ext)s"));
    }

    #[test]
    fn anti_blocking_options_pass_through() {
        let opts = DownloadOptions {
            use_cookies: true,
            proxy_url: Some("socks5://127.0.0.1:9050".to_string()),
            rate_limit: Some("2M".to_string()),
            user_agent: Some("custom-agent/1.0".to_string()),
            impersonate: Some("chrome".to_string()),
            ..Default::default()
        };
        let args = build_args(URL, &opts);
        assert_eq!(value_of(&args, "--cookies-from-browser"), Some("chrome"));
        assert_eq!(value_of(&args, "--proxy"), Some("socks5://127.0.0.1:9050"));
        assert_eq!(value_of(&args, "--limit-rate"), Some("2M"));
        assert_eq!(value_of(&args, "--user-agent"), Some("custom-agent/1.0"));
        assert_eq!(value_of(&args, "--impersonate"), Some("chrome"));
        assert_eq!(args.last().map(String::as_str), Some(URL));
    }

    #[test]
    fn named_cookie_browser_and_blank_user_agent() {
        let opts = DownloadOptions {
            use_cookies: true,
            browser_name: Some("firefox".to_string()),
            user_agent: Some(String::new()),
            ..Default::default()
        };
        let args = build_args(URL, &opts);
        assert_eq!(value_of(&args, "--cookies-from-browser"), Some("firefox"));
        assert_eq!(value_of(&args, "--user-agent"), Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn subtitle_flags_map_one_to_one() {
        let opts = DownloadOptions {
            download_subs: true,
            download_auto_subs: true,
            embed_subtitles: true,
            subtitle_langs: vec!["en".to_string(), "es".to_string()],
            subtitle_format: Some("srt".to_string()),
            ..Default::default()
        };
        let args = build_args(URL, &opts);
        assert_eq!(value_of(&args, "--sub-langs"), Some("en,es"));
        assert_eq!(value_of(&args, "--convert-subs"), Some("srt"));
        assert!(has(&args, "--write-subs"));
        assert!(has(&args, "--write-auto-subs"));
        assert!(has(&args, "--embed-subs"));
    }

    #[test]
    fn external_subtitle_files_imply_write_subs() {
        let opts = DownloadOptions {
            external_sub_files: true,
            ..Default::default()
        };
        assert!(has(&build_args(URL, &opts), "--write-subs"));
    }

    #[test]
    fn playlist_options() {
        let opts = DownloadOptions {
            no_playlist: true,
            playlist_start: 2,
            playlist_end: 5,
            ..Default::default()
        };
        let args = build_args(URL, &opts);
        assert!(has(&args, "--no-playlist"));
        assert_eq!(value_of(&args, "--playlist-start"), Some("2"));
        assert_eq!(value_of(&args, "--playlist-end"), Some("5"));
    }

    #[test]
    fn format_presets() {
        let with = |format: &str| DownloadOptions {
            format: Some(format.to_string()),
            ..Default::default()
        };
        assert_eq!(format_choice(&with("best")).selector, DEFAULT_FORMAT);
        assert_eq!(
            format_choice(&with("1080p")).selector,
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]"
        );
        assert_eq!(
            format_choice(&with("bv*+ba")).selector,
            "bv*+ba",
            "raw selectors pass through"
        );
        let audio = format_choice(&with("audio"));
        assert_eq!(audio.selector, AUDIO_FORMAT);
        assert!(audio.extract_audio);
    }

    #[test]
    fn audio_only_extracts_audio_and_skips_merge_container() {
        let opts = DownloadOptions {
            audio_only: true,
            video_format: Some("mp4".to_string()),
            ..Default::default()
        };
        let args = build_args(URL, &opts);
        assert_eq!(value_of(&args, "--format"), Some(AUDIO_FORMAT));
        assert!(has(&args, "--extract-audio"));
        assert!(!has(&args, "--merge-output-format"));

        let video = DownloadOptions {
            video_format: Some("mkv".to_string()),
            ..Default::default()
        };
        assert_eq!(
            value_of(&build_args(URL, &video), "--merge-output-format"),
            Some("mkv")
        );
    }
}
