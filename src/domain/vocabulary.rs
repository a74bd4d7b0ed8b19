// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Bidirectional mapping between symbols (words) and the integer
// indices the model consumes and produces.
//
// Three entries are reserved and must always be present:
//   <PAD> — fills sequences up to the batch length, never corrupted,
//           ignored by the loss
//   <SOS> — first token of every decoder input
//   <EOS> — last token of every target; stops decoding
//
// A second Vocabulary can be used at evaluation time to decode
// ground truth stored in a different symbol space from the one
// the model was trained on.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{bail, ensure, Result};

pub const PAD_TOKEN: &str = "<PAD>";
pub const SOS_TOKEN: &str = "<SOS>";
pub const EOS_TOKEN: &str = "<EOS>";

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    w2i: HashMap<String, usize>,
    i2w: HashMap<usize, String>,
    pad: usize,
    sos: usize,
    eos: usize,
}

impl Vocabulary {
    /// Build from an explicit word → index table.
    ///
    /// Fails if a reserved token is missing or two words share an index.
    pub fn from_w2i(w2i: HashMap<String, usize>) -> Result<Self> {
        let mut i2w = HashMap::with_capacity(w2i.len());
        for (word, &idx) in &w2i {
            if let Some(previous) = i2w.insert(idx, word.clone()) {
                bail!("Index {idx} is assigned to both '{previous}' and '{word}'");
            }
        }

        let lookup = |token: &str| -> Result<usize> {
            match w2i.get(token) {
                Some(&idx) => Ok(idx),
                None => bail!("Vocabulary is missing the reserved token '{token}'"),
            }
        };
        let pad = lookup(PAD_TOKEN)?;
        let sos = lookup(SOS_TOKEN)?;
        let eos = lookup(EOS_TOKEN)?;

        Ok(Self { w2i, i2w, pad, sos, eos })
    }

    /// Build a fresh vocabulary: <PAD>=0, <SOS>=1, <EOS>=2, then every
    /// distinct word in sorted order.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let reserved = [PAD_TOKEN, SOS_TOKEN, EOS_TOKEN];
        let distinct: BTreeSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().to_string())
            .filter(|w| !reserved.contains(&w.as_str()))
            .collect();

        let mut w2i = HashMap::with_capacity(distinct.len() + reserved.len());
        for (idx, word) in reserved.iter().map(|w| w.to_string()).chain(distinct).enumerate() {
            w2i.insert(word, idx);
        }
        let i2w = w2i.iter().map(|(w, &i)| (i, w.clone())).collect();

        Self { w2i, i2w, pad: 0, sos: 1, eos: 2 }
    }

    pub fn len(&self) -> usize {
        self.w2i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.w2i.is_empty()
    }

    pub fn pad_index(&self) -> usize {
        self.pad
    }

    pub fn sos_index(&self) -> usize {
        self.sos
    }

    pub fn eos_index(&self) -> usize {
        self.eos
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.w2i.get(word).copied()
    }

    /// Word for a model output index
    pub fn word(&self, idx: usize) -> Result<&str> {
        match self.i2w.get(&idx) {
            Some(w) => Ok(w.as_str()),
            None => bail!("Index {idx} is not in the vocabulary ({} entries)", self.len()),
        }
    }

    /// Encode a transcript as `[<SOS>, words.., <EOS>]`.
    pub fn encode_with_bounds(&self, words: &[String]) -> Result<Vec<usize>> {
        let mut out = Vec::with_capacity(words.len() + 2);
        out.push(self.sos);
        for word in words {
            let Some(idx) = self.index_of(word) else {
                bail!("Symbol '{word}' is not in the vocabulary");
            };
            out.push(idx);
        }
        out.push(self.eos);
        Ok(out)
    }

    /// Decode indices back to words.
    pub fn decode(&self, indices: &[usize]) -> Result<Vec<String>> {
        indices.iter().map(|&i| self.word(i).map(str::to_string)).collect()
    }

    /// Sorted copy of the word → index table, for serialisation
    pub fn to_w2i(&self) -> BTreeMap<String, usize> {
        self.w2i.iter().map(|(w, &i)| (w.clone(), i)).collect()
    }

    /// Every index must be below `len()` so that it is a valid
    /// row of the embedding and a valid class of the output layer.
    pub fn ensure_dense(&self) -> Result<()> {
        let n = self.len();
        for &idx in self.i2w.keys() {
            ensure!(idx < n, "Index {idx} is out of range for a vocabulary of {n} entries");
        }
        Ok(())
    }
}
