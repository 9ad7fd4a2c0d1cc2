use crate::foundation::error::{TilestackError, TilestackResult};

/// One node of the tile quadtree. Level 0 is a single tile covering the whole image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub level: i32,
    pub x: i64,
    pub y: i64,
}

impl TileAddress {
    pub fn new(level: i32, x: i64, y: i64) -> Self {
        Self { level, x, y }
    }

    pub fn is_valid(&self) -> bool {
        (0..62).contains(&self.level)
            && (0..1i64 << self.level).contains(&self.x)
            && (0..1i64 << self.level).contains(&self.y)
    }

    fn check(&self) -> TilestackResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(TilestackError::CoordinateOutOfBounds {
                level: self.level,
                x: self.x,
                y: self.y,
            })
        }
    }

    /// `'r'` followed by one base-4 digit per level, root-most first.
    pub fn basename(&self) -> TilestackResult<String> {
        self.check()?;
        let level = self.level as usize;
        let mut name = vec![b'r'; level + 1];
        for i in 0..level {
            let digit = ((self.x >> i) & 1) + 2 * ((self.y >> i) & 1);
            name[level - i] = b'0' + digit as u8;
        }
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    /// Relative path of this tile, without extension.
    ///
    /// The basename is split into 3-character directories, with the full basename as the
    /// file name: level 6, x=42, y=12 becomes `r10/321/r103210`.
    pub fn path(&self) -> TilestackResult<String> {
        let name = self.basename()?;
        let mut path = String::with_capacity(name.len() * 2);
        let mut i = 0;
        while i + 3 < name.len() {
            path.push_str(&name[i..i + 3]);
            path.push('/');
            i += 3;
        }
        path.push_str(&name);
        Ok(path)
    }

    /// Packed cache key: `level << 56 | y << 28 | x`, with 28 bits per coordinate.
    pub fn key(&self) -> u64 {
        ((self.level as u64) << 56)
            | (((self.y as u64) & 0x0fff_ffff) << 28)
            | ((self.x as u64) & 0x0fff_ffff)
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[tile level={} x={} y={}]", self.level, self.x, self.y)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pyramid/tile_address.rs"]
mod tests;
