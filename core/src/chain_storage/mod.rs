// Copyright 2024. The MWEB Developers
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The layered coins state: a DB-backed committed view plus stackable dirty caches, flushed as
//! one atomic batch.

mod coins_view;
mod coins_view_cache;
mod coins_view_db;
mod error;
mod kv;

pub use coins_view::{CoinsView, Tree, TreeSource, TreeUpdates, UtxoEntry, ViewUpdates};
pub use coins_view_cache::{BlockUndo, CoinsViewCache, Roots, SpentOutput};
pub use coins_view_db::CoinsViewDb;
pub use error::ChainStorageError;
pub use kv::{
    BatchOp,
    KeyValueStore,
    MemoryStore,
    WriteBatch,
    TABLE_HEADER,
    TABLE_INFO,
    TABLE_LEAF,
    TABLE_NODE,
    TABLE_UTXO,
};
