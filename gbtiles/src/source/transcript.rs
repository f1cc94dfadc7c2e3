/// Exons are drawn at least this fraction of a pixel wide: the minimum width
/// in base pairs is `bp_per_pixel / MIN_WIDTH_PX`.
pub const MIN_WIDTH_PX: f64 = 1000.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockKind {
    Utr = 0,
    Exon = 1,
    Intron = 2,
}

/// One piece of a transcript, relative to the gene start.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub offset: i64,
    pub len: i64,
}

impl Block {
    fn new(kind: BlockKind, offset: i64, len: i64) -> Block {
        Block { kind, offset, len }
    }

    pub fn end(&self) -> i64 {
        self.offset + self.len
    }
}

/// Breaks a transcript into UTR, exon and intron blocks.
///
/// `exon_starts` are relative to `gene_start` (as in a BED12 `blockStarts`
/// column), the CDS bounds are absolute. Exons narrower than
/// `min_feature_width` borrow base pairs from the intron that follows them so
/// that they stay visible; the intron shrinks by the same amount and the
/// blocks remain contiguous. Exon parts outside the CDS are tagged as UTR.
pub fn decode(
    gene_start: i64,
    gene_end: i64,
    exon_starts: &[i64],
    exon_lens: &[i64],
    cds_start: i64,
    cds_end: i64,
    min_feature_width: f64,
) -> Vec<Block> {
    let gene_len = gene_end - gene_start;
    let cds_start = cds_start - gene_start;
    let cds_end = cds_end - gene_start;

    let mut blocks: Vec<Block> = vec![];
    let mut prev_exon_end = 0;
    let mut undershoot = 0;
    for (&exon_start, &exon_len) in exon_starts.iter().zip(exon_lens) {
        if exon_start < prev_exon_end || exon_start >= gene_len || exon_len <= 0 {
            continue;
        }
        let mut exon_start = exon_start;
        let mut exon_len = exon_len.min(gene_len - exon_start);
        let new_undershoot = (min_feature_width - exon_len as f64).max(0.0).ceil() as i64;

        if exon_start != prev_exon_end {
            let mut intron_start = prev_exon_end;
            let mut intron_len = exon_start - prev_exon_end;
            if let Some(prev) = blocks.last_mut() {
                let stolen = undershoot.min(intron_len);
                prev.len += stolen;
                intron_start += stolen;
                intron_len -= stolen;
            }
            if intron_len > 0 {
                blocks.push(Block::new(BlockKind::Intron, intron_start, intron_len));
            }
        }
        if cds_start > exon_start && cds_start < exon_start + exon_len {
            blocks.push(Block::new(BlockKind::Exon, exon_start, cds_start - exon_start));
            exon_len -= cds_start - exon_start;
            exon_start = cds_start;
        }
        if cds_end > exon_start && cds_end < exon_start + exon_len {
            blocks.push(Block::new(BlockKind::Exon, exon_start, cds_end - exon_start));
            exon_len -= cds_end - exon_start;
            exon_start = cds_end;
        }
        let exon = Block::new(BlockKind::Exon, exon_start, exon_len);
        prev_exon_end = exon.end();
        blocks.push(exon);
        undershoot = new_undershoot;
    }

    for block in blocks.iter_mut() {
        if block.kind == BlockKind::Exon && (block.offset < cds_start || block.offset >= cds_end) {
            block.kind = BlockKind::Utr;
        }
    }
    blocks
}

/// Parses a BED12 list column such as `120,45,300,`.
pub fn parse_block_list(text: &str) -> Option<Vec<i64>> {
    let text = text.strip_suffix(',').unwrap_or(text);
    if text.is_empty() {
        return Some(vec![]);
    }
    text.split(',').map(|v| v.trim().parse().ok()).collect()
}

/// The blocks of several transcripts, split by kind into parallel arrays.
///
/// `nump[i]` is the number of blocks of transcript `i`; `pattern` holds the
/// kind of every block in order and the length arrays hold, in the same
/// order, the lengths of the blocks of each kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockArrays {
    pub nump: Vec<u64>,
    pub pattern: Vec<u8>,
    pub utrs: Vec<i64>,
    pub exons: Vec<i64>,
    pub introns: Vec<i64>,
}

impl BlockArrays {
    pub fn push_transcript(&mut self, blocks: &[Block]) {
        self.nump.push(blocks.len() as u64);
        for block in blocks {
            self.pattern.push(block.kind as u8);
            match block.kind {
                BlockKind::Utr => self.utrs.push(block.len),
                BlockKind::Exon => self.exons.push(block.len),
                BlockKind::Intron => self.introns.push(block.len),
            }
        }
    }

    /// Regroups the arrays into the blocks of each transcript.
    #[cfg(test)]
    pub fn transcripts(&self) -> Vec<Vec<(BlockKind, i64)>> {
        let mut utrs = self.utrs.iter();
        let mut exons = self.exons.iter();
        let mut introns = self.introns.iter();
        let mut pattern = self.pattern.iter();
        self.nump
            .iter()
            .map(|count| {
                (0..*count)
                    .filter_map(|_| {
                        let kind = *pattern.next()?;
                        match kind {
                            0 => utrs.next().map(|len| (BlockKind::Utr, *len)),
                            1 => exons.next().map(|len| (BlockKind::Exon, *len)),
                            _ => introns.next().map(|len| (BlockKind::Intron, *len)),
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
