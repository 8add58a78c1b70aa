use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

pub const DEFAULT_URLS: [&str; 5] = [
    "https://youtu.be/TEDiegpFsQM",
    "https://youtu.be/YthChN1Wq8M",
    "https://youtu.be/HBB37gsHJmQ",
    "https://youtu.be/CSvFpBOe8eY",
    "https://youtu.be/IcrbM1l_BoI",
];

static VIDEO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$")
        .expect("video URL pattern is valid")
});

pub fn default_urls() -> Vec<String> {
    DEFAULT_URLS.iter().map(|url| (*url).to_string()).collect()
}

pub fn is_video_url(candidate: &str) -> bool {
    VIDEO_URL_REGEX.is_match(candidate)
}

pub fn filter_video_urls<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| is_video_url(line))
        .map(str::to_string)
        .collect()
}

pub fn load_video_urls(path: &Path, defaults: &[String]) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let urls = filter_video_urls(content.lines());
            if !urls.is_empty() {
                debug!(path = %path.display(), count = urls.len(), "loaded video list");
                return urls;
            }
            debug!(path = %path.display(), "video list has no valid links, writing defaults");
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "video list missing, writing defaults");
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unable to read video list, using defaults");
            return defaults.to_vec();
        }
    }

    if let Err(err) = write_video_urls(path, defaults) {
        warn!(path = %path.display(), error = %err, "unable to write default video list");
    }
    defaults.to_vec()
}

pub fn write_video_urls(path: &Path, urls: &[String]) -> io::Result<()> {
    fs::write(path, urls.join("\n"))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn accepts_common_video_link_shapes() {
        assert!(is_video_url("https://youtu.be/TEDiegpFsQM"));
        assert!(is_video_url("http://www.youtube.com/watch?v=TEDiegpFsQM"));
        assert!(is_video_url("youtube.com/watch?v=abc"));
    }

    #[test]
    fn rejects_other_hosts_and_bare_domains() {
        assert!(!is_video_url("https://vimeo.com/123"));
        assert!(!is_video_url("https://youtu.be/"));
        assert!(!is_video_url("ftp://youtube.com/watch?v=abc"));
        assert!(!is_video_url(""));
    }

    #[test]
    fn filter_keeps_only_matching_lines_in_order() {
        let content = "https://youtu.be/b\nnot a link\n  https://youtu.be/a  \n\nhttps://example.com/x\n";
        let urls = filter_video_urls(content.lines());
        assert_eq!(urls, vec!["https://youtu.be/b", "https://youtu.be/a"]);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("videos.txt");

        let urls = load_video_urls(&path, &default_urls());

        assert_eq!(urls, default_urls());
        let written = fs::read_to_string(&path).expect("defaults written");
        assert_eq!(written, DEFAULT_URLS.join("\n"));
    }

    #[test]
    fn file_without_valid_links_is_replaced_by_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("videos.txt");
        fs::write(&path, "hello\nhttps://vimeo.com/1\n").expect("write");

        let urls = load_video_urls(&path, &default_urls());

        assert_eq!(urls.len(), 5);
        assert_eq!(urls, default_urls());
        let written = fs::read_to_string(&path).expect("read back");
        assert_eq!(filter_video_urls(written.lines()), default_urls());
    }

    #[test]
    fn mixed_file_returns_matching_lines_and_is_not_rewritten() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("videos.txt");
        let content = "https://youtu.be/zzz\n# morning playlist\nhttps://www.youtube.com/watch?v=aaa\n";
        fs::write(&path, content).expect("write");

        let urls = load_video_urls(&path, &default_urls());

        assert_eq!(
            urls,
            vec!["https://youtu.be/zzz", "https://www.youtube.com/watch?v=aaa"]
        );
        assert_eq!(fs::read_to_string(&path).expect("read back"), content);
    }

    #[test]
    fn custom_defaults_are_used_for_empty_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("videos.txt");
        fs::write(&path, "").expect("write");
        let defaults = vec!["https://youtu.be/custom".to_string()];

        let urls = load_video_urls(&path, &defaults);

        assert_eq!(urls, defaults);
        assert_eq!(
            fs::read_to_string(&path).expect("read back"),
            "https://youtu.be/custom"
        );
    }

    #[test]
    fn unwritable_location_still_returns_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("missing-dir").join("videos.txt");

        let urls = load_video_urls(&path, &default_urls());

        assert_eq!(urls, default_urls());
        assert!(!path.exists());
    }
}
