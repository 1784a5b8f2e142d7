//! Matte post-processing: morphological expansion/contraction and feathering.

use std::collections::VecDeque;

use matteline_core::MatteBuffer;

/// Grow (`expansion > 0`) or shrink (`expansion < 0`) the matte, then feather it.
/// `expansion == 0` and `feather == 0` leave the matte untouched.
pub fn postprocess(matte: &MatteBuffer, expansion: i32, feather: u32) -> MatteBuffer {
    let mut out = match expansion.signum() {
        1 => dilate(matte, expansion.unsigned_abs()),
        -1 => erode(matte, expansion.unsigned_abs()),
        _ => matte.clone(),
    };
    if feather > 0 {
        out = feather_matte(&out, feather);
    }
    out
}

/// Dilation with a 3×3 square, repeated `iterations` times.
/// Pixels outside the matte are ignored.
pub fn dilate(matte: &MatteBuffer, iterations: u32) -> MatteBuffer {
    morph(matte, iterations, |a, b| a >= b)
}

/// Erosion with a 3×3 square, repeated `iterations` times.
/// Pixels outside the matte are ignored.
pub fn erode(matte: &MatteBuffer, iterations: u32) -> MatteBuffer {
    morph(matte, iterations, |a, b| a <= b)
}

/// `n` passes of a 3×3 square equal one pass of a `(2n+1)`-wide square,
/// applied separably as a sliding-window extreme over rows then columns.
fn morph(matte: &MatteBuffer, iterations: u32, keeps: fn(u8, u8) -> bool) -> MatteBuffer {
    let (w, h) = (matte.width as usize, matte.height as usize);
    if iterations == 0 || w == 0 || h == 0 {
        return matte.clone();
    }
    let radius = iterations as usize;

    let mut rows = vec![0u8; w * h];
    for y in 0..h {
        let line = &matte.data[y * w..(y + 1) * w];
        sliding_extreme(line, radius, &mut rows[y * w..(y + 1) * w], keeps);
    }

    let mut out = MatteBuffer::new(matte.width, matte.height);
    let mut column = vec![0u8; h];
    let mut result = vec![0u8; h];
    for x in 0..w {
        for y in 0..h {
            column[y] = rows[y * w + x];
        }
        sliding_extreme(&column, radius, &mut result, keeps);
        for y in 0..h {
            out.data[y * w + x] = result[y];
        }
    }
    out
}

/// `out[i]` = extreme of `line[i - radius ..= i + radius]`, clipped to the line.
/// `keeps(a, b)` is true when `a` should replace `b` as the extreme.
fn sliding_extreme(line: &[u8], radius: usize, out: &mut [u8], keeps: fn(u8, u8) -> bool) {
    let n = line.len();
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0;

    for (i, slot) in out.iter_mut().enumerate() {
        let end = (i + radius).min(n - 1);
        while next <= end {
            while let Some(&back) = window.back() {
                if keeps(line[next], line[back]) {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }
        let start = i.saturating_sub(radius);
        while let Some(&front) = window.front() {
            if front < start {
                window.pop_front();
            } else {
                break;
            }
        }
        if let Some(&front) = window.front() {
            *slot = line[front];
        }
    }
}

/// Gaussian kernel size for a feather radius. Always odd, at least 3.
pub fn feather_kernel_size(feather: u32) -> usize {
    (feather as usize * 2 + 1).max(3)
}

/// The conventional sigma for a Gaussian of kernel size `ksize`.
pub fn default_sigma(ksize: usize) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Separable Gaussian blur of the matte with kernel `feather_kernel_size(feather)`.
/// Borders reflect without repeating the edge pixel.
pub fn feather_matte(matte: &MatteBuffer, feather: u32) -> MatteBuffer {
    let (w, h) = (matte.width as usize, matte.height as usize);
    if w == 0 || h == 0 {
        return matte.clone();
    }
    let ksize = feather_kernel_size(feather);
    let kernel = gaussian_kernel_q16(ksize, default_sigma(ksize));
    let radius = (ksize / 2) as i64;

    let mut tmp = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in kernel.iter().enumerate() {
                let sx = reflect_101(x as i64 + ki as i64 - radius, w);
                acc += kw as u64 * matte.data[y * w + sx] as u64;
            }
            tmp[y * w + x] = q16_to_u8(acc);
        }
    }

    let mut out = MatteBuffer::new(matte.width, matte.height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u64;
            for (ki, &kw) in kernel.iter().enumerate() {
                let sy = reflect_101(y as i64 + ki as i64 - radius, h);
                acc += kw as u64 * tmp[sy * w + x] as u64;
            }
            out.data[y * w + x] = q16_to_u8(acc);
        }
    }
    out
}

/// Normalized Gaussian weights in 16.16 fixed point, summing to exactly 1.0.
fn gaussian_kernel_q16(ksize: usize, sigma: f64) -> Vec<u32> {
    let r = (ksize / 2) as i64;
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|&wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&q| q as i64).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (weights[mid] as i64 + delta).clamp(0, 65536) as u32;
    }
    weights
}

/// Map an out-of-range index into `0..len` by mirroring about the edge
/// pixels (`dcb|abcd|cba`).
fn reflect_101(mut i: i64, len: usize) -> usize {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * (len - 1) - i;
        } else {
            return i as usize;
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}
