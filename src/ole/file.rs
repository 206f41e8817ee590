use super::consts::*;
use fixedbitset::FixedBitSet;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE header structure (512 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    clsid: [u8; 16],
    minor_version: U16<LE>,
    /// 3 for 512-byte sectors, 4 for 4096-byte sectors
    major_version: U16<LE>,
    /// Must be 0xFFFE
    byte_order: U16<LE>,
    sector_shift: U16<LE>,
    mini_sector_shift: U16<LE>,
    reserved: [u8; 6],
    num_dir_sectors: U32<LE>,
    num_fat_sectors: U32<LE>,
    first_dir_sector: U32<LE>,
    transaction_signature: U32<LE>,
    mini_stream_cutoff: U32<LE>,
    first_minifat_sector: U32<LE>,
    num_minifat_sectors: U32<LE>,
    first_difat_sector: U32<LE>,
    num_difat_sectors: U32<LE>,
    /// First 109 FAT sector ids
    difat: [U32<LE>; HEADER_DIFAT_ENTRIES],
}

/// Raw OLE directory entry structure (128 bytes)
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Error types for OLE file parsing
#[derive(Error, Debug)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Not an OLE file")]
    NotOleFile,
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),
    #[error("Stream not found: {0}")]
    StreamNotFound(String),
}

/// A decoded directory entry.
#[derive(Debug, Clone)]
struct DirectoryEntry {
    name: String,
    entry_type: u8,
    sid_left: u32,
    sid_right: u32,
    sid_child: u32,
    start_sector: u32,
    size: u64,
}

/// A stream reachable from the root storage.
#[derive(Debug, Clone)]
struct StreamInfo {
    /// Storage names and the stream name joined by `/`
    path: String,
    sid: usize,
}

/// Read-only view of an OLE2 compound document.
///
/// Only the parts needed to enumerate and read streams are decoded: the FAT,
/// the MiniFAT and the directory. Streams are listed by their full path, with
/// storage names joined by `/`, in sorted order.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u64,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<DirectoryEntry>,
    streams: Vec<StreamInfo>,
    /// Mini stream data (loaded on demand)
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes)?;
        let header = RawHeader::read_from_bytes(&bytes[..])
            .map_err(|_| OleError::InvalidFormat("Failed to parse header".to_string()))?;
        if &header.magic != MAGIC {
            return Err(OleError::NotOleFile);
        }
        if header.byte_order.get() != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }

        let sector_shift = header.sector_shift.get();
        let mini_sector_shift = header.mini_sector_shift.get();
        match (header.major_version.get(), sector_shift) {
            (3, 9) | (4, 12) => {},
            _ => return Err(OleError::InvalidFormat("Sector size mismatch".to_string())),
        }
        if mini_sector_shift >= sector_shift {
            return Err(OleError::InvalidFormat("Invalid mini sector size".to_string()));
        }

        let mut ole = OleFile {
            reader,
            sector_size: 1usize << sector_shift,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff: header.mini_stream_cutoff.get() as u64,
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            streams: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header, file_size)?;
        ole.load_directory(header.first_dir_sector.get())?;
        if header.num_minifat_sectors.get() > 0 {
            let data = ole.read_chain(header.first_minifat_sector.get())?;
            ole.minifat = read_u32_table(&data);
        }
        Ok(ole)
    }

    /// Load the File Allocation Table.
    ///
    /// The first 109 FAT sector ids live in the header, the rest in the DIFAT
    /// sector chain. The chain can visit each sector of the file at most once.
    fn load_fat(&mut self, header: &RawHeader, file_size: u64) -> Result<(), OleError> {
        // Whole sectors after the header slot
        let sector_count = (file_size / self.sector_size as u64).saturating_sub(1) as usize;

        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .map(|id| id.get())
            .take_while(|&id| id != FREESECT && id != ENDOFCHAIN)
            .collect();

        let ids_per_sector = self.sector_size / 4 - 1;
        let mut visited = FixedBitSet::with_capacity(sector_count);
        let mut difat_sector = header.first_difat_sector.get();
        for _ in 0..header.num_difat_sectors.get() {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let index = difat_sector as usize;
            if index >= sector_count {
                return Err(OleError::CorruptedFile(
                    "DIFAT sector past the end of the file".to_string(),
                ));
            }
            if visited.put(index) {
                return Err(OleError::CorruptedFile("Loop in DIFAT chain".to_string()));
            }
            let table = read_u32_table(&self.read_sector(difat_sector)?);
            fat_sectors.extend(
                table[..ids_per_sector]
                    .iter()
                    .copied()
                    .take_while(|&id| id != FREESECT && id != ENDOFCHAIN),
            );
            difat_sector = table[ids_per_sector];
        }
        if fat_sectors.len() > sector_count {
            return Err(OleError::CorruptedFile(
                "More FAT sectors than the file holds".to_string(),
            ));
        }

        self.fat.reserve(fat_sectors.len() * (self.sector_size / 4));
        for sector in fat_sectors {
            let data = self.read_sector(sector)?;
            self.fat.extend(read_u32_table(&data));
        }
        Ok(())
    }

    /// Decode the directory and collect every stream path.
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let data = self.read_chain(first_dir_sector)?;
        self.entries = data
            .chunks_exact(DIRENTRY_SIZE)
            .map(|chunk| self.decode_entry(chunk))
            .collect::<Result<_, _>>()?;

        let root = self
            .entries
            .first()
            .filter(|e| e.entry_type == STGTY_ROOT)
            .ok_or_else(|| OleError::CorruptedFile("Missing root entry".to_string()))?;

        // Each directory entry is visited at most once, so a malformed sibling
        // tree cannot loop.
        let mut visited = FixedBitSet::with_capacity(self.entries.len());
        visited.insert(0);
        let mut pending = vec![(root.sid_child, String::new())];
        let mut streams = Vec::new();

        while let Some((sid, prefix)) = pending.pop() {
            if sid == NOSTREAM {
                continue;
            }
            let index = sid as usize;
            if index >= self.entries.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid directory entry index".to_string(),
                ));
            }
            if visited.put(index) {
                continue;
            }
            let entry = &self.entries[index];
            pending.push((entry.sid_left, prefix.clone()));
            pending.push((entry.sid_right, prefix.clone()));

            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };
            match entry.entry_type {
                STGTY_STREAM => streams.push(StreamInfo { path, sid: index }),
                STGTY_STORAGE => pending.push((entry.sid_child, path)),
                _ => {},
            }
        }

        streams.sort_by(|a, b| a.path.cmp(&b.path));
        self.streams = streams;
        Ok(())
    }

    fn decode_entry(&self, data: &[u8]) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::InvalidFormat("Failed to parse directory entry".to_string()))?;

        let name_len = (raw.name_len.get() as usize).saturating_sub(2).min(64);
        let name = decode_utf16le(&raw.name[..name_len]);

        // 512-byte sector files only use the low 32 bits of the size
        let size = if self.sector_size == 512 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        Ok(DirectoryEntry {
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
        })
    }

    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        if sector_id > MAXREGSECT {
            return Err(OleError::CorruptedFile(format!(
                "Special sector id {sector_id:#X} used as data"
            )));
        }
        // The header occupies the slot of sector -1
        let position = (sector_id as u64 + 1) * self.sector_size as u64;
        self.reader.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a sector chain by following the FAT.
    fn read_chain(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut steps = 0usize;
        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in FAT".to_string(),
                ));
            }
            steps += 1;
            if steps > self.fat.len() {
                return Err(OleError::CorruptedFile("Loop in FAT chain".to_string()));
            }
            data.extend_from_slice(&self.read_sector(sector)?);
            sector = self.fat[sector as usize];
        }
        Ok(data)
    }

    /// Read a mini sector chain by following the MiniFAT.
    fn read_mini_chain(&mut self, start_sector: u32, size: u64) -> Result<Vec<u8>, OleError> {
        if self.ministream.is_none() {
            let root_start = self.entries[0].start_sector;
            self.ministream = Some(self.read_chain(root_start)?);
        }
        let ministream = self.ministream.as_deref().unwrap_or_default();

        let mut data = Vec::with_capacity(size as usize);
        let mut sector = start_sector;
        let mut steps = 0usize;
        while sector != ENDOFCHAIN && (data.len() as u64) < size {
            if sector as usize >= self.minifat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in MiniFAT".to_string(),
                ));
            }
            steps += 1;
            if steps > self.minifat.len() {
                return Err(OleError::CorruptedFile("Loop in MiniFAT chain".to_string()));
            }
            let position = sector as usize * self.mini_sector_size;
            let chunk = ministream
                .get(position..position + self.mini_sector_size)
                .ok_or_else(|| OleError::CorruptedFile("Mini sector out of bounds".to_string()))?;
            data.extend_from_slice(chunk);
            sector = self.minifat[sector as usize];
        }
        data.truncate(size as usize);
        Ok(data)
    }

    /// Full paths of all streams, sorted.
    pub fn stream_paths(&self) -> impl Iterator<Item = &str> {
        self.streams.iter().map(|s| s.path.as_str())
    }

    /// Canonical path of the stream matching `path` case-insensitively.
    pub fn find(&self, path: &str) -> Option<&str> {
        self.stream(path).map(|s| s.path.as_str())
    }

    /// Declared size of a stream in bytes.
    pub fn stream_size(&self, path: &str) -> Option<u64> {
        self.stream(path).map(|s| self.entries[s.sid].size)
    }

    fn stream(&self, path: &str) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.path.eq_ignore_ascii_case(path))
    }

    /// Read a whole stream by path.
    pub fn open_stream(&mut self, path: &str) -> Result<Vec<u8>, OleError> {
        let sid = self
            .stream(path)
            .map(|s| s.sid)
            .ok_or_else(|| OleError::StreamNotFound(path.to_string()))?;
        let DirectoryEntry {
            start_sector, size, ..
        } = self.entries[sid];

        if size < self.mini_stream_cutoff {
            self.read_mini_chain(start_sector, size)
        } else {
            let mut data = self.read_chain(start_sector)?;
            if (data.len() as u64) < size {
                return Err(OleError::CorruptedFile(format!(
                    "Stream {path} is shorter than its declared size"
                )));
            }
            data.truncate(size as usize);
            Ok(data)
        }
    }
}

fn read_u32_table(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .filter_map(|chunk| U32::<LE>::read_from_bytes(chunk).ok())
        .map(|v| v.get())
        .collect()
}

/// Decode UTF-16LE bytes to String
fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string()
}
