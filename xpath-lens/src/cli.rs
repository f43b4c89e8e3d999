//! CLI argument parsing using clap

use clap::Parser;

/// XPath tester for XML and HTML documents
#[derive(Parser, Debug)]
#[command(name = "xpath-lens")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Evaluate an expression against a file
    xpath-lens page.html -x "//div[@id='content']"

    # Read XML from stdin, print matched values only
    cat feed.xml | xpath-lens --xml -x "//item/title" -o value

    # Resolve a click position (line 14, column 8) to an XPath
    xpath-lens page.html --at 14:8

    # CI: fail if any anchor is missing an href
    xpath-lens page.html -x "//a[not(@href)]" --expect none
"#)]
pub struct Args {
    /// File to query (reads stdin when omitted)
    #[arg()]
    pub file: Option<String>,

    /// XPath 3.1 expression to evaluate
    #[arg(short = 'x', long = "xpath")]
    pub xpath: Option<String>,

    /// Force forgiving HTML parsing
    #[arg(long = "html", conflicts_with = "xml")]
    pub html: bool,

    /// Force XML parsing
    #[arg(long = "xml")]
    pub xml: bool,

    /// Resolve a LINE:COL position to an XPath instead of evaluating
    #[arg(long = "at", value_name = "LINE:COL")]
    pub at: Option<String>,

    /// Output format: text (default), json, value, count
    #[arg(short = 'o', long = "output", default_value = "text")]
    pub output: String,

    /// Limit output to first N matches
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<usize>,

    /// Expected match count: none, some, or a number (exit 1 if not met)
    #[arg(short = 'e', long = "expect")]
    pub expect: Option<String>,

    /// Document size in bytes above which evaluation runs on a worker thread
    #[arg(long = "threshold")]
    pub threshold: Option<usize>,

    /// Show verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
