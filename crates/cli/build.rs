use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("pagemark")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Pagemark Contributors")
        .about("Capture web pages as Markdown")
        .arg(clap::arg!(<INPUT> "URL to fetch, local HTML file, or '-' for stdin"))
        .arg(clap::arg!(--url <URL> "Page URL to record (default: the input URL or file location)"))
        .arg(clap::arg!(--title <TITLE> "Page title (default: the document's <title>)"))
        .arg(clap::arg!(--source <SOURCE> "Name of the requesting collaborator").default_value("cli"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (markdown, json)")
                .value_name("FORMAT")
                .default_value("markdown")
                .value_parser(["markdown", "json"]),
        )
        .arg(clap::arg!(--no_frontmatter "Omit the frontmatter block (Markdown only)"))
        .arg(
            clap::arg!(--frontmatter_style <STYLE> "Frontmatter syntax (yaml, toml)")
                .default_value("yaml")
                .value_parser(["yaml", "toml"]),
        )
        .arg(clap::arg!(--tag <TAG> ... "Classification tag for the frontmatter (repeatable)"))
        .arg(
            clap::arg!(--bullet <CHAR> "Bullet marker for unordered lists")
                .default_value("-")
                .value_parser(["-", "*", "+"]),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(--stage_timeout <SECS> "Timeout for each capture stage in seconds").default_value("10"))
        .arg(clap::arg!(--no_agent "Do not start an in-page agent; capture by injection only"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "pagemark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "pagemark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "pagemark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "pagemark", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
