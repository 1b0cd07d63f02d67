//! End-to-end build of a small site: directory cascade, blog posts with
//! redirect stubs, imports, the Site Index, and verbatim assets.

use cascade_ssg::build::{build, check};
use cascade_ssg::config::BuildConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Site {
    _tmp: TempDir,
    src: PathBuf,
    tgt: PathBuf,
}

impl Site {
    fn new(files: &[(&str, &str)]) -> Self {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let tgt = tmp.path().join("tgt");
        for (rel, content) in files {
            let path = src.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        Self { _tmp: tmp, src, tgt }
    }

    fn config(&self) -> BuildConfig {
        BuildConfig {
            source: self.src.clone(),
            target: self.tgt.clone(),
            ..BuildConfig::default()
        }
    }

    fn read(&self, rel: &str) -> String {
        let path = self.tgt.join(rel);
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
    }

    fn exists(&self, rel: &str) -> bool {
        self.tgt.join(rel).exists()
    }
}

fn blog_site() -> Site {
    Site::new(&[
        ("site.json", r#"{"site": "Demo", "author": {"name": "Ann", "email": "ann@example.com"}}"#),
        ("blog/blog.json", r#"{"section": "Blog", "author": {"name": "Bo"}}"#),
        (
            "default.template",
            "<title>{{ title }} | {{ site }}</title>{{ importhtml(path=\"partials/nav.source\") }}<main>{{ content | safe }}</main>",
        ),
        ("partials/nav.source", "<nav>{{ section | default(value=\"Home\") }}</nav>"),
        (
            "blog/2024-03-01-hello-world.md",
            "{\"toc\": true}\n---\n# Intro\n\nBy {{ author.name }} ({{ author.email }})\n\n## Details\n\nSee https://example.com.\n",
        ),
        ("blog/2024-04-15-second_post.md", "Second."),
        (
            "index.html",
            "{\"title\": \"Home\"}\n---\n<ul>{% for post in files.blog | sorted %}<li>{{ post.title }}</li>{% endfor %}</ul>",
        ),
        ("css/site.css", "body { margin: 0 }"),
        (".drafts/2024-05-01-secret.md", "hidden"),
    ])
}

#[test]
fn builds_the_whole_site() {
    let site = blog_site();
    let report = build(&site.config()).unwrap();

    assert_eq!(report.rendered.len(), 3);
    assert_eq!(report.copied, vec![site.tgt.join("css/site.css")]);
    assert_eq!(report.redirects.len(), 4);
    assert_eq!(report.ignored.len(), 4);
    assert!(report.overwritten.is_empty());
}

#[test]
fn directory_metadata_cascades_into_blog_posts() {
    let site = blog_site();
    build(&site.config()).unwrap();

    let post = site.read("blog/2024/03/hello-world.html");
    assert!(post.contains("<title>Hello World | Demo</title>"));
    assert!(post.contains("<nav>Blog</nav>"));
    // nested mapping merged: name from blog/, email from the root
    assert!(post.contains("By Bo (ann@example.com)"));
}

#[test]
fn imports_render_with_the_importing_page_metadata() {
    let site = blog_site();
    build(&site.config()).unwrap();

    let post = site.read("blog/2024/04/second_post.html");
    assert!(post.contains("<title>Second Post | Demo</title>"));
    assert!(post.contains("<nav>Blog</nav>"));
}

#[test]
fn toc_is_rendered_when_requested() {
    let site = blog_site();
    build(&site.config()).unwrap();

    let with_toc = site.read("blog/2024/03/hello-world.html");
    assert!(with_toc.contains(r#"<nav class="toc">"#));
    assert!(with_toc.contains(r##"<a href="#details">Details</a>"##));
    assert!(with_toc.contains(r#"<a href="https://example.com">https://example.com</a>."#));

    let without = site.read("blog/2024/04/second_post.html");
    assert!(!without.contains(r#"<nav class="toc">"#));
}

#[test]
fn blog_posts_leave_redirect_stubs_at_legacy_urls() {
    let site = blog_site();
    build(&site.config()).unwrap();

    for legacy in [
        "blog/2024-03-01-hello-world.html",
        "blog/2024/03/01/hello-world.html",
    ] {
        let stub = site.read(legacy);
        assert!(stub.contains(r#"content="0; url=/blog/2024/03/hello-world.html""#));
    }
}

#[test]
fn index_page_lists_posts_in_sortkey_order() {
    let site = blog_site();
    build(&site.config()).unwrap();

    assert_eq!(
        site.read("index.html"),
        "<ul><li>Hello World</li><li>Second Post</li></ul>"
    );
}

#[test]
fn assets_copied_and_inputs_not_emitted() {
    let site = blog_site();
    build(&site.config()).unwrap();

    assert_eq!(site.read("css/site.css"), "body { margin: 0 }");
    assert!(!site.exists("site.json"));
    assert!(!site.exists("default.template"));
    assert!(!site.exists("partials/nav.source"));
    assert!(!site.exists(".drafts"));
}

#[test]
fn check_sees_every_page_and_no_hidden_ones() {
    let site = blog_site();
    let gathered = check(&site.config()).unwrap();

    assert_eq!(gathered.pages().len(), 3);
    let blog = gathered.index()["blog"].as_object().unwrap();
    assert_eq!(
        blog["2024-03-01-hello-world.md"]["url"],
        serde_json::json!("/blog/2024/03/hello-world.html")
    );
    assert!(gathered.index().get(".drafts").is_none());
    assert!(!site.tgt.exists());
}

#[test]
fn target_inside_source_is_not_walked() {
    let site = Site::new(&[("index.html", "hi"), ("out/stale.html", "{{ broken")]);
    let config = BuildConfig {
        target: site.src.join("out"),
        ..site.config()
    };

    let report = build(&config).unwrap();
    assert_eq!(report.rendered, vec![site.src.join("out/index.html")]);
}

#[test]
fn import_cycle_fails_the_build() {
    let site = Site::new(&[
        ("a.html", "{{ importhtml(path=\"b.source\") }}"),
        ("b.source", "{{ importhtml(path=\"a.html\") }}"),
    ]);

    let err = build(&site.config()).unwrap_err();
    assert!(err.to_string().contains("import cycle"), "{err}");
}

#[test]
fn target_spelled_as_the_source_leaves_sources_alone() {
    let site = Site::new(&[("index.html", "{\"title\": \"T\"}\n---\n<h1>{{ title }}</h1>")]);
    let config = BuildConfig {
        target: site.src.join("../other/../src"),
        ..site.config()
    };

    let err = build(&config).unwrap_err();
    assert!(err.to_string().contains("is the source directory"), "{err}");
    assert_eq!(
        fs::read_to_string(site.src.join("index.html")).unwrap(),
        "{\"title\": \"T\"}\n---\n<h1>{{ title }}</h1>"
    );
}

#[cfg(unix)]
#[test]
fn symlinked_post_builds_like_a_regular_one() {
    let site = blog_site();
    let shared = site.src.parent().unwrap().join("2024-06-01-shared.md");
    fs::write(&shared, "Shared by {{ author.name }}.").unwrap();
    std::os::unix::fs::symlink(&shared, site.src.join("blog/2024-06-01-shared.md")).unwrap();

    let report = build(&site.config()).unwrap();
    assert_eq!(report.rendered.len(), 4);
    assert!(site.read("blog/2024/06/shared.html").contains("Shared by Bo."));
    assert!(site.read("index.html").contains("<li>Shared</li>"));
}
