//! Sequence Similarity
//!
//! 블록 매칭 기반 유사도 (Ratcliff/Obershelp 계열).
//! 가장 긴 공통 블록을 찾고 좌우 구간에 재귀 적용하여 일치 문자 수 M을 구하고,
//! `ratio = 2*M / (len(a) + len(b))` 로 계산합니다.
//!
//! 퍼지 임계값이 이 알고리즘의 동점 처리 규칙에 맞춰 조정되어 있으므로
//! 단순 Levenshtein 정규화로 대체하면 안 됩니다.

use std::collections::HashMap;

/// 자동 junk 휴리스틱이 적용되는 두 번째 시퀀스의 최소 길이
const AUTOJUNK_MIN_LEN: usize = 200;

/// 고정된 첫 번째 시퀀스(a)에 여러 후보(b)를 순서대로 비교하는 매처
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    /// b의 문자 -> 등장 위치 (오름차순). 빈도가 높은 문자는 제외될 수 있음
    b2j: HashMap<char, Vec<usize>>,
}

impl SequenceMatcher {
    pub fn new(a: &str, b: &str) -> Self {
        let mut matcher = Self {
            a: a.chars().collect(),
            b: Vec::new(),
            b2j: HashMap::new(),
        };
        matcher.set_second(b);
        matcher
    }

    /// 비교 대상(b) 교체. a 쪽 상태는 유지됩니다.
    pub fn set_second(&mut self, b: &str) {
        self.b = b.chars().collect();
        self.b2j.clear();
        for (j, c) in self.b.iter().enumerate() {
            self.b2j.entry(*c).or_default().push(j);
        }

        let n = self.b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            self.b2j.retain(|_, positions| positions.len() <= ntest);
        }
    }

    /// 일치 블록들의 총 문자 수
    pub fn matching_characters(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }

    /// 정확한 유사도 [0, 1]
    pub fn ratio(&self) -> f64 {
        calculate_ratio(self.matching_characters(), self.a.len() + self.b.len())
    }

    /// 문자 다중집합 교집합 기반 상한값 (ratio 이상이 보장됨)
    pub fn quick_ratio(&self) -> f64 {
        let mut available: HashMap<char, usize> = HashMap::new();
        for c in &self.b {
            *available.entry(*c).or_insert(0) += 1;
        }

        let mut matches = 0;
        for c in &self.a {
            if let Some(count) = available.get_mut(c) {
                if *count > 0 {
                    *count -= 1;
                    matches += 1;
                }
            }
        }

        calculate_ratio(matches, self.a.len() + self.b.len())
    }

    /// 길이만으로 계산한 가장 느슨한 상한값
    pub fn real_quick_ratio(&self) -> f64 {
        let (la, lb) = (self.a.len(), self.b.len());
        calculate_ratio(la.min(lb), la + lb)
    }

    /// a[alo..ahi], b[blo..bhi] 구간에서 가장 긴 일치 블록 (i, j, size)
    ///
    /// 동점이면 a에서 가장 먼저 시작하는 블록, 그중에서도 b에서 가장 먼저 시작하는 블록을 택합니다.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j > 0 {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    };
                    let k = prev + 1;
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // autojunk로 제외된 고빈도 문자도 블록 양끝에서는 확장 대상
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }
}

fn calculate_ratio(matches: usize, length: usize) -> f64 {
    if length == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / length as f64
}

/// 단발성 유사도 계산
pub fn similarity(a: &str, b: &str) -> f64 {
    SequenceMatcher::new(a, b).ratio()
}
