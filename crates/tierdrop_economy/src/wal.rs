//! # Write-Ahead Log (WAL)
//!
//! **Crash-Safe Balance and Grant Journal**
//!
//! Every balance movement and reward grant is journalled before the
//! in-memory stores are considered authoritative. If the process dies
//! mid-resolution, restart recovery replays committed transactions and
//! discards uncommitted ones, so a debit is never silently kept without
//! its grants (or compensation) on disk.
//!
//! ## Guarantees
//!
//! 1. **Durability**: Once `commit()` returns, the records are on disk
//! 2. **Atomicity**: A transaction's operations replay entirely or not at all
//! 3. **Recovery**: On reopen, incomplete transactions are rolled back
//!
//! ## Format
//!
//! ```text
//! [4 bytes: magic "TWAL"]
//! [4 bytes: version]
//! [8 bytes: last checkpoint LSN]
//!
//! Entry format:
//! [8 bytes: LSN (Log Sequence Number)]
//! [1 byte: record type (BEGIN/OP/COMMIT/ROLLBACK)]
//! [4 bytes: payload length]
//! [N bytes: payload (serialized operation)]
//! [4 bytes: CRC32 of above]
//! ```

use crate::error::{EconomyError, EconomyResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tierdrop_core::{CardId, OwnedPackId, PackId, SessionId, UserId};

/// Magic bytes identifying a journal file.
const WAL_MAGIC: &[u8; 4] = b"TWAL";

/// Current journal format version.
const WAL_VERSION: u32 = 1;

/// WAL record types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Begin a new transaction.
    Begin = 1,
    /// An operation within a transaction.
    Operation = 2,
    /// Commit the transaction (durable).
    Commit = 3,
    /// Rollback the transaction.
    Rollback = 4,
}

impl RecordType {
    /// Converts from u8.
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Begin),
            2 => Some(Self::Operation),
            3 => Some(Self::Commit),
            4 => Some(Self::Rollback),
            _ => None,
        }
    }
}

/// Operations that can be journalled and replayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalOperation {
    /// Credits removed from an account.
    Debit {
        /// Account debited.
        user: UserId,
        /// Amount in minor units (cents).
        amount_minor: u64,
        /// Transaction category tag.
        category: u8,
        /// Human-readable description.
        description: String,
        /// Unix timestamp of the original movement.
        timestamp: u64,
    },
    /// Credits added to an account.
    Credit {
        /// Account credited.
        user: UserId,
        /// Amount in minor units (cents).
        amount_minor: u64,
        /// Transaction category tag.
        category: u8,
        /// Human-readable description.
        description: String,
        /// Unix timestamp of the original movement.
        timestamp: u64,
    },
    /// A pack minted into an inventory.
    GrantPack {
        /// Owned-pack id assigned at mint time.
        owned_pack: OwnedPackId,
        /// Receiving account.
        user: UserId,
        /// Pack definition id.
        pack: PackId,
        /// Rarity tier as u8.
        tier: u8,
        /// Session that produced the grant.
        session: SessionId,
        /// How the pack was earned (game name or "purchase").
        provenance: String,
        /// Whether the pack was already consumed by an opening.
        opened: bool,
    },
    /// A card added to an inventory.
    GrantCard {
        /// Receiving account.
        user: UserId,
        /// Card definition id.
        card: CardId,
        /// Rarity tier as u8.
        tier: u8,
        /// Copies added.
        quantity: u32,
    },
    /// An owned pack consumed by an opening.
    PackOpened {
        /// Account that opened it.
        user: UserId,
        /// The pack consumed.
        owned_pack: OwnedPackId,
    },
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&u32::try_from(s.len()).unwrap_or(u32::MAX).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn get_str(data: &[u8], pos: &mut usize) -> Option<String> {
    let len = u32::from_le_bytes(data.get(*pos..*pos + 4)?.try_into().ok()?) as usize;
    *pos += 4;
    let s = std::str::from_utf8(data.get(*pos..*pos + len)?).ok()?;
    *pos += len;
    Some(s.to_string())
}

fn get_u64(data: &[u8], pos: &mut usize) -> Option<u64> {
    let v = u64::from_le_bytes(data.get(*pos..*pos + 8)?.try_into().ok()?);
    *pos += 8;
    Some(v)
}

fn get_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    let v = u32::from_le_bytes(data.get(*pos..*pos + 4)?.try_into().ok()?);
    *pos += 4;
    Some(v)
}

fn get_u8(data: &[u8], pos: &mut usize) -> Option<u8> {
    let v = *data.get(*pos)?;
    *pos += 1;
    Some(v)
}

impl WalOperation {
    /// Serializes the operation to bytes.
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Debit { user, amount_minor, category, description, timestamp } => {
                buf.push(1); // Type tag
                buf.extend_from_slice(&user.to_le_bytes());
                buf.extend_from_slice(&amount_minor.to_le_bytes());
                buf.push(*category);
                put_str(&mut buf, description);
                buf.extend_from_slice(&timestamp.to_le_bytes());
            }
            Self::Credit { user, amount_minor, category, description, timestamp } => {
                buf.push(2);
                buf.extend_from_slice(&user.to_le_bytes());
                buf.extend_from_slice(&amount_minor.to_le_bytes());
                buf.push(*category);
                put_str(&mut buf, description);
                buf.extend_from_slice(&timestamp.to_le_bytes());
            }
            Self::GrantPack { owned_pack, user, pack, tier, session, provenance, opened } => {
                buf.push(3);
                buf.extend_from_slice(&owned_pack.to_le_bytes());
                buf.extend_from_slice(&user.to_le_bytes());
                buf.extend_from_slice(&pack.to_le_bytes());
                buf.push(*tier);
                buf.extend_from_slice(&session.to_le_bytes());
                put_str(&mut buf, provenance);
                buf.push(u8::from(*opened));
            }
            Self::GrantCard { user, card, tier, quantity } => {
                buf.push(4);
                buf.extend_from_slice(&user.to_le_bytes());
                buf.extend_from_slice(&card.to_le_bytes());
                buf.push(*tier);
                buf.extend_from_slice(&quantity.to_le_bytes());
            }
            Self::PackOpened { user, owned_pack } => {
                buf.push(5);
                buf.extend_from_slice(&user.to_le_bytes());
                buf.extend_from_slice(&owned_pack.to_le_bytes());
            }
        }

        buf
    }

    /// Deserializes an operation from bytes.
    fn deserialize(data: &[u8]) -> Option<Self> {
        let mut pos = 0;
        let tag = get_u8(data, &mut pos)?;

        match tag {
            1 | 2 => {
                let user = get_u64(data, &mut pos)?;
                let amount_minor = get_u64(data, &mut pos)?;
                let category = get_u8(data, &mut pos)?;
                let description = get_str(data, &mut pos)?;
                let timestamp = get_u64(data, &mut pos)?;
                if tag == 1 {
                    Some(Self::Debit { user, amount_minor, category, description, timestamp })
                } else {
                    Some(Self::Credit { user, amount_minor, category, description, timestamp })
                }
            }
            3 => {
                let owned_pack = get_u64(data, &mut pos)?;
                let user = get_u64(data, &mut pos)?;
                let pack = get_u32(data, &mut pos)?;
                let tier = get_u8(data, &mut pos)?;
                let session = get_u64(data, &mut pos)?;
                let provenance = get_str(data, &mut pos)?;
                let opened = get_u8(data, &mut pos)? != 0;
                Some(Self::GrantPack { owned_pack, user, pack, tier, session, provenance, opened })
            }
            4 => {
                let user = get_u64(data, &mut pos)?;
                let card = get_u32(data, &mut pos)?;
                let tier = get_u8(data, &mut pos)?;
                let quantity = get_u32(data, &mut pos)?;
                Some(Self::GrantCard { user, card, tier, quantity })
            }
            5 => {
                let user = get_u64(data, &mut pos)?;
                let owned_pack = get_u64(data, &mut pos)?;
                Some(Self::PackOpened { user, owned_pack })
            }
            _ => None,
        }
    }
}

/// A WAL record on disk.
#[derive(Clone, Debug)]
struct WalRecord {
    /// Log Sequence Number (unique, monotonic).
    lsn: u64,
    /// Record type.
    record_type: RecordType,
    /// Payload data.
    payload: Vec<u8>,
}

/// Transaction handle for grouping operations.
///
/// Dropping a transaction without committing writes a rollback record,
/// so a panic between begin and commit never leaves the journal open.
pub struct Transaction<'a> {
    /// Reference to the WAL.
    wal: &'a WriteAheadLog,
    /// Operations in this transaction.
    operations: Vec<WalOperation>,
    /// Whether this transaction has been finalized.
    finalized: bool,
}

impl Transaction<'_> {
    /// Adds an operation to the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] if the journal write
    /// fails or the transaction was already finalized.
    pub fn add_operation(&mut self, op: WalOperation) -> EconomyResult<()> {
        if self.finalized {
            return Err(EconomyError::StorageUnavailable(
                "transaction already finalized".to_string(),
            ));
        }

        self.wal.write_record(RecordType::Operation, &op.serialize())?;
        self.operations.push(op);

        Ok(())
    }

    /// Commits the transaction (durable) and returns its operations.
    ///
    /// After this returns, the records are guaranteed to be on disk.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] if the commit record
    /// or fsync fails.
    pub fn commit(mut self) -> EconomyResult<Vec<WalOperation>> {
        if self.finalized {
            return Err(EconomyError::StorageUnavailable(
                "transaction already finalized".to_string(),
            ));
        }

        self.wal.write_record(RecordType::Commit, &[])?;
        self.wal.sync()?;
        self.finalized = true;

        Ok(std::mem::take(&mut self.operations))
    }

    /// Rolls back the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] if the rollback record
    /// cannot be written.
    pub fn rollback(mut self) -> EconomyResult<()> {
        if self.finalized {
            return Ok(());
        }

        self.wal.write_record(RecordType::Rollback, &[])?;
        self.finalized = true;

        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        // If not finalized, auto-rollback
        if !self.finalized {
            let _ = self.wal.write_record(RecordType::Rollback, &[]);
        }
    }
}

/// Write-ahead log for crash-safe balance and grant journalling.
pub struct WriteAheadLog {
    /// Path to the journal file.
    path: PathBuf,
    /// Current Log Sequence Number.
    current_lsn: AtomicU64,
    /// File handle (protected by mutex for writes).
    file: Mutex<BufWriter<File>>,
}

impl WriteAheadLog {
    /// Opens or creates a journal file.
    ///
    /// Returns the log alongside the committed operations found in it,
    /// in journal order, so the caller can replay them into the stores.
    /// Uncommitted transactions are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] on any io failure and
    /// [`EconomyError::InvalidConfig`] if the file is not a journal.
    pub fn open(path: impl AsRef<Path>) -> EconomyResult<(Self, Vec<WalOperation>)> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| EconomyError::StorageUnavailable(format!("failed to open WAL: {e}")))?;

        let wal = Self {
            path,
            current_lsn: AtomicU64::new(0),
            file: Mutex::new(BufWriter::new(file)),
        };

        // If file is empty, write header
        {
            let mut file = wal.file.lock();
            let metadata = file
                .get_ref()
                .metadata()
                .map_err(|e| EconomyError::StorageUnavailable(format!("WAL metadata: {e}")))?;

            if metadata.len() == 0 {
                file.write_all(WAL_MAGIC)
                    .map_err(|e| EconomyError::StorageUnavailable(format!("WAL header: {e}")))?;
                file.write_all(&WAL_VERSION.to_le_bytes())
                    .map_err(|e| EconomyError::StorageUnavailable(format!("WAL header: {e}")))?;
                file.write_all(&0u64.to_le_bytes())
                    .map_err(|e| EconomyError::StorageUnavailable(format!("WAL header: {e}")))?;
                file.flush()
                    .map_err(|e| EconomyError::StorageUnavailable(format!("WAL flush: {e}")))?;
            }

            // Position the writer at the tail whether the journal was just
            // created or already held records, so appends never clobber the
            // header or earlier transactions.
            file.seek(SeekFrom::End(0))
                .map_err(|e| EconomyError::StorageUnavailable(format!("WAL seek: {e}")))?;
        }

        let committed = wal.recover()?;

        Ok((wal, committed))
    }

    /// Begins a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] if the begin record
    /// cannot be written.
    pub fn begin_transaction(&self) -> EconomyResult<Transaction<'_>> {
        self.write_record(RecordType::Begin, &[])?;

        Ok(Transaction {
            wal: self,
            operations: Vec::new(),
            finalized: false,
        })
    }

    /// Writes a record to the journal.
    fn write_record(&self, record_type: RecordType, payload: &[u8]) -> EconomyResult<u64> {
        let lsn = self.current_lsn.fetch_add(1, Ordering::SeqCst);

        let payload_len = u32::try_from(payload.len())
            .map_err(|_| EconomyError::StorageUnavailable("WAL payload too large".to_string()))?;

        let mut frame = Vec::with_capacity(8 + 1 + 4 + payload.len() + 4);
        frame.extend_from_slice(&lsn.to_le_bytes());
        frame.push(record_type as u8);
        frame.extend_from_slice(&payload_len.to_le_bytes());
        frame.extend_from_slice(payload);

        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        let mut file = self.file.lock();
        file.write_all(&frame)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL write failed: {e}")))?;

        Ok(lsn)
    }

    /// Syncs the journal to disk.
    fn sync(&self) -> EconomyResult<()> {
        let mut file = self.file.lock();
        file.flush()
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL sync failed: {e}")))?;
        file.get_ref()
            .sync_all()
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL sync failed: {e}")))?;
        Ok(())
    }

    /// Scans the journal and returns committed operations in order.
    fn recover(&self) -> EconomyResult<Vec<WalOperation>> {
        let mut committed_ops = Vec::new();

        let file = File::open(&self.path)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL reopen: {e}")))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        if reader.read_exact(&mut magic).is_err() {
            return Ok(committed_ops); // Empty file
        }
        if &magic != WAL_MAGIC {
            return Err(EconomyError::InvalidConfig("invalid WAL magic".to_string()));
        }

        let mut version_bytes = [0u8; 4];
        reader
            .read_exact(&mut version_bytes)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL header read: {e}")))?;
        let version = u32::from_le_bytes(version_bytes);
        if version != WAL_VERSION {
            return Err(EconomyError::InvalidConfig(format!(
                "unsupported WAL version: {version}"
            )));
        }

        let mut lsn_bytes = [0u8; 8];
        reader
            .read_exact(&mut lsn_bytes)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL header read: {e}")))?;
        let checkpoint_lsn = u64::from_le_bytes(lsn_bytes);

        // Single-writer journal: at most one transaction is open at a time,
        // so operations belong to the latest unfinalized BEGIN.
        let mut open_txn: Option<Vec<WalOperation>> = None;
        let mut max_lsn = checkpoint_lsn;
        let mut dropped = 0u64;

        loop {
            let record = match Self::read_record(&mut reader) {
                Ok(r) => r,
                Err(_) => break, // End of file or torn tail
            };

            max_lsn = max_lsn.max(record.lsn);

            match record.record_type {
                RecordType::Begin => {
                    if open_txn.take().is_some() {
                        dropped += 1;
                    }
                    open_txn = Some(Vec::new());
                }
                RecordType::Operation => {
                    if let (Some(ops), Some(op)) =
                        (open_txn.as_mut(), WalOperation::deserialize(&record.payload))
                    {
                        ops.push(op);
                    }
                }
                RecordType::Commit => {
                    if let Some(ops) = open_txn.take() {
                        committed_ops.extend(ops);
                    }
                }
                RecordType::Rollback => {
                    open_txn = None;
                }
            }
        }

        if open_txn.is_some() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "WAL recovery rolled back uncommitted transactions");
        }

        self.current_lsn.store(max_lsn + 1, Ordering::SeqCst);

        Ok(committed_ops)
    }

    /// Reads a single record from the journal.
    fn read_record(reader: &mut BufReader<File>) -> EconomyResult<WalRecord> {
        let mut lsn_bytes = [0u8; 8];
        reader
            .read_exact(&mut lsn_bytes)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL read: {e}")))?;
        let lsn = u64::from_le_bytes(lsn_bytes);

        let mut type_byte = [0u8; 1];
        reader
            .read_exact(&mut type_byte)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL read: {e}")))?;
        let record_type = RecordType::from_u8(type_byte[0])
            .ok_or_else(|| EconomyError::StorageUnavailable("invalid record type".to_string()))?;

        let mut len_bytes = [0u8; 4];
        reader
            .read_exact(&mut len_bytes)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL read: {e}")))?;
        let payload_len = u32::from_le_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; payload_len];
        reader
            .read_exact(&mut payload)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL read: {e}")))?;

        let mut crc_bytes = [0u8; 4];
        reader
            .read_exact(&mut crc_bytes)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL read: {e}")))?;
        let stored_crc = u32::from_le_bytes(crc_bytes);

        let mut crc_data = Vec::with_capacity(8 + 1 + 4 + payload_len);
        crc_data.extend_from_slice(&lsn_bytes);
        crc_data.push(type_byte[0]);
        crc_data.extend_from_slice(&len_bytes);
        crc_data.extend_from_slice(&payload);

        if stored_crc != crc32fast::hash(&crc_data) {
            return Err(EconomyError::StorageUnavailable("CRC mismatch".to_string()));
        }

        Ok(WalRecord {
            lsn,
            record_type,
            payload,
        })
    }

    /// Truncates the journal after the stores have been snapshotted
    /// elsewhere. The next recovery starts from an empty log.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StorageUnavailable`] on io failure.
    pub fn checkpoint(&self) -> EconomyResult<()> {
        let mut file = self.file.lock();

        file.seek(SeekFrom::Start(0))
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL seek: {e}")))?;

        file.write_all(WAL_MAGIC)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL write: {e}")))?;
        file.write_all(&WAL_VERSION.to_le_bytes())
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL write: {e}")))?;

        let current_lsn = self.current_lsn.load(Ordering::SeqCst);
        file.write_all(&current_lsn.to_le_bytes())
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL write: {e}")))?;

        file.flush()
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL flush: {e}")))?;

        file.get_ref()
            .set_len(16)
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL truncate: {e}")))?;

        file.seek(SeekFrom::End(0))
            .map_err(|e| EconomyError::StorageUnavailable(format!("WAL seek: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_wal_path() -> PathBuf {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tierdrop_wal_{id}.wal"))
    }

    fn sample_debit() -> WalOperation {
        WalOperation::Debit {
            user: 7,
            amount_minor: 2000,
            category: 1,
            description: "plinko play".to_string(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_create_and_open() {
        let path = temp_wal_path();
        {
            let (_wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert!(committed.is_empty());
        }
        assert!(path.exists());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_operation_round_trip() {
        let ops = vec![
            sample_debit(),
            WalOperation::Credit {
                user: 7,
                amount_minor: 7,
                category: 2,
                description: "bulk liquidation".to_string(),
                timestamp: 1_700_000_001,
            },
            WalOperation::GrantPack {
                owned_pack: 3,
                user: 7,
                pack: 10,
                tier: 3,
                session: 42,
                provenance: "plinko".to_string(),
                opened: false,
            },
            WalOperation::GrantCard {
                user: 7,
                card: 2,
                tier: 3,
                quantity: 1,
            },
            WalOperation::PackOpened {
                user: 7,
                owned_pack: 3,
            },
        ];
        for op in ops {
            assert_eq!(WalOperation::deserialize(&op.serialize()), Some(op));
        }
    }

    #[test]
    fn test_committed_transaction_survives_reopen() {
        let path = temp_wal_path();
        {
            let (wal, _) = WriteAheadLog::open(&path).unwrap();
            let mut txn = wal.begin_transaction().unwrap();
            txn.add_operation(sample_debit()).unwrap();
            txn.commit().unwrap();
        }
        {
            let (_wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert_eq!(committed, vec![sample_debit()]);
        }
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_reopen_then_write_preserves_history() {
        let path = temp_wal_path();
        let refill = WalOperation::Credit {
            user: 7,
            amount_minor: 500,
            category: 4,
            description: "refill".to_string(),
            timestamp: 1_700_000_002,
        };
        {
            let (wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert!(committed.is_empty());
            let mut txn = wal.begin_transaction().unwrap();
            txn.add_operation(sample_debit()).unwrap();
            txn.commit().unwrap();
        }
        // Second lifetime journals more work after replaying the first.
        {
            let (wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert_eq!(committed, vec![sample_debit()]);
            let mut txn = wal.begin_transaction().unwrap();
            txn.add_operation(refill.clone()).unwrap();
            txn.commit().unwrap();
        }
        // Third lifetime must still see both transactions intact.
        {
            let (_wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert_eq!(committed, vec![sample_debit(), refill]);
        }
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_uncommitted_transaction_discarded() {
        let path = temp_wal_path();
        {
            let (wal, _) = WriteAheadLog::open(&path).unwrap();
            let mut txn = wal.begin_transaction().unwrap();
            txn.add_operation(sample_debit()).unwrap();
            // Flush the buffered records so the torn state reaches disk,
            // then leak the transaction to simulate a crash before commit.
            wal.sync().unwrap();
            std::mem::forget(txn);
        }
        {
            let (_wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert!(committed.is_empty());
        }
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_rollback_discards_operations() {
        let path = temp_wal_path();
        {
            let (wal, _) = WriteAheadLog::open(&path).unwrap();
            let mut txn = wal.begin_transaction().unwrap();
            txn.add_operation(sample_debit()).unwrap();
            txn.rollback().unwrap();
            wal.sync().unwrap();
        }
        {
            let (_wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert!(committed.is_empty());
        }
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_checkpoint_truncates() {
        let path = temp_wal_path();
        {
            let (wal, _) = WriteAheadLog::open(&path).unwrap();
            let mut txn = wal.begin_transaction().unwrap();
            txn.add_operation(sample_debit()).unwrap();
            txn.commit().unwrap();
            wal.checkpoint().unwrap();
        }
        {
            let (_wal, committed) = WriteAheadLog::open(&path).unwrap();
            assert!(committed.is_empty());
        }
        fs::remove_file(&path).ok();
    }
}
