/// Folder component standing in for the vault root.
pub const ROOT_COMPONENT: &str = "/";

/// Contiguous range of documents sharing their first `depth` folders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FolderSquare {
    pub depth: usize,
    pub start: usize,
    pub end: usize,
}

impl FolderSquare {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

/// Folder squares grouped by depth; `levels()[0]` holds depth 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderSquares {
    levels: Vec<Vec<FolderSquare>>,
}

impl FolderSquares {
    pub fn max_depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Vec<FolderSquare>] {
        &self.levels
    }

    pub fn at_depth(&self, depth: usize) -> &[FolderSquare] {
        depth
            .checked_sub(1)
            .and_then(|level| self.levels.get(level))
            .map_or(&[], Vec::as_slice)
    }

    pub fn containing(&self, index: usize) -> impl Iterator<Item = &FolderSquare> + '_ {
        self.levels
            .iter()
            .filter_map(move |level| level.iter().find(|square| square.contains(index)))
    }

    pub fn square_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

/// Folders of a vault-relative path, without the file name.
///
/// Notes in the vault root get the single [`ROOT_COMPONENT`].
pub fn folder_components(path: &str) -> Vec<&str> {
    let mut parts = path
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();
    parts.pop();
    if parts.is_empty() {
        parts.push(ROOT_COMPONENT);
    }
    parts
}

/// Splits the documents, in their fixed order, into one square per maximal
/// run of equal truncated folder paths at every depth.
///
/// At depth `d` only documents with at least `d` folders take part; runs are
/// found by adjacency in that subsequence, never by re-sorting, and the first
/// and last runs are emitted like any other.
pub fn decompose<S: AsRef<str>>(paths: &[S]) -> FolderSquares {
    let components = paths
        .iter()
        .map(|path| folder_components(path.as_ref()))
        .collect::<Vec<_>>();
    let max_depth = components.iter().map(Vec::len).max().unwrap_or(0);

    let levels = (1..=max_depth)
        .map(|depth| squares_at_depth(&components, depth))
        .collect();

    FolderSquares { levels }
}

fn squares_at_depth(components: &[Vec<&str>], depth: usize) -> Vec<FolderSquare> {
    let mut squares = Vec::new();
    let mut run: Option<(&[&str], usize, usize)> = None;

    for (index, parts) in components.iter().enumerate() {
        if parts.len() < depth {
            continue;
        }
        let key = &parts[..depth];

        run = match run {
            Some((run_key, start, _)) if run_key == key => Some((run_key, start, index)),
            Some((_, start, end)) => {
                squares.push(FolderSquare { depth, start, end });
                Some((key, index, index))
            }
            None => Some((key, index, index)),
        };
    }

    if let Some((_, start, end)) = run {
        squares.push(FolderSquare { depth, start, end });
    }

    squares
}
