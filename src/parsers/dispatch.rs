use regex::Regex;

/// Ordered (header pattern, route) pairs tested top to bottom. Register
/// the most specific patterns first; a trailing catch-all (for
/// `------ FOO ------` headers nothing else claims) keeps unrecognized
/// sections from bleeding into the previous one.
pub struct SectionDispatcher<R> {
    routes: Vec<(Regex, R)>,
}

/// One consecutive run of lines. `route`/`header` are `None` for the
/// leading block before the first recognized header; every other block
/// excludes its own header line.
#[derive(Debug)]
pub struct Block<R> {
    pub route: Option<R>,
    pub header: Option<String>,
    pub lines: Vec<String>,
}

impl<R: Copy> SectionDispatcher<R> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a header pattern. Earlier registrations win over later
    /// ones, so order routes from most to least specific.
    pub fn route(mut self, pattern: &str, route: R) -> Self {
        let regex = Regex::new(pattern).expect("section header pattern should compile");
        self.routes.push((regex, route));
        self
    }

    /// First registered route whose pattern matches the line.
    pub fn match_line(&self, line: &str) -> Option<R> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(line))
            .map(|(_, route)| *route)
    }

    /// Partition lines into consecutive blocks, one per recognized header.
    /// Processing blocks in order gives the commit-before-next-section
    /// guarantee: a block is complete before the next one starts, and the
    /// final block is flushed at end of input.
    pub fn split_blocks<'a, I>(&self, lines: I) -> Vec<Block<R>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut blocks = Vec::new();
        let mut current = Block {
            route: None,
            header: None,
            lines: Vec::new(),
        };

        for line in lines {
            if let Some(route) = self.match_line(line) {
                blocks.push(current);
                current = Block {
                    route: Some(route),
                    header: Some(line.to_string()),
                    lines: Vec::new(),
                };
            } else {
                current.lines.push(line.to_string());
            }
        }
        blocks.push(current);
        blocks
    }
}

impl<R: Copy> Default for SectionDispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}
