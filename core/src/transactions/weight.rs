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

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Per-element weight constants, fixed by the chain parameters.
///
/// `weight = inputs·a + outputs·b + kernels·c + extra_data_bytes / d`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightParams {
    pub input_weight: u64,
    pub output_weight: u64,
    pub kernel_weight: u64,
    /// Kernel extra-data bytes per weight unit.
    pub extra_bytes_per_weight: NonZeroU64,
}

impl WeightParams {
    pub fn calculate(&self, num_inputs: usize, num_outputs: usize, num_kernels: usize, extra_bytes: usize) -> u64 {
        self.input_weight * num_inputs as u64 +
            self.output_weight * num_outputs as u64 +
            self.kernel_weight * num_kernels as u64 +
            extra_bytes as u64 / self.extra_bytes_per_weight.get()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> WeightParams {
        WeightParams {
            input_weight: 1,
            output_weight: 18,
            kernel_weight: 2,
            extra_bytes_per_weight: NonZeroU64::new(42).unwrap(),
        }
    }

    #[test]
    fn weight_is_linear_in_elements() {
        let w = params();
        assert_eq!(w.calculate(0, 0, 0, 0), 0);
        assert_eq!(w.calculate(2, 2, 1, 0), 2 + 36 + 2);
        // extra data rounds down per weight unit
        assert_eq!(w.calculate(0, 0, 1, 41), 2);
        assert_eq!(w.calculate(0, 0, 1, 42), 3);
    }
}
