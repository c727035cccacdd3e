//! Benchmarks for the offline classifier and chunking.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use doc_classify::chunker::{chunk_paragraphs, ChunkConfig};
use doc_classify::classify::{self, Classifier, LexicalClassifier};
use doc_classify::config::{Settings, TextStrategy};
use doc_classify::extract::{DocumentFormat, ExtractedText};

const PARAGRAPH: &str = "This Agreement is entered into by and between the parties. The \
                         Licensee shall indemnify the Licensor against any liability. This \
                         contract is governed by the laws of the State of Delaware and any \
                         dispute shall be resolved by arbitration.";

fn long_document() -> ExtractedText {
    ExtractedText::from_text(vec![PARAGRAPH; 200].join("\n\n"), DocumentFormat::PlainText)
}

fn bench_lexical_score(c: &mut Criterion) {
    let classifier = LexicalClassifier::new();
    let labels = Settings::default().categories;

    c.bench_function("lexical_score_paragraph", |bench| {
        bench.iter(|| black_box(classifier.score(black_box(PARAGRAPH), &labels).unwrap()))
    });
}

fn bench_chunking(c: &mut Criterion) {
    let doc = long_document();
    let config = ChunkConfig::default();

    c.bench_function("chunk_200_paragraphs", |bench| {
        bench.iter(|| black_box(chunk_paragraphs(&doc.paragraphs, &config)))
    });
}

fn bench_classify_text(c: &mut Criterion) {
    let classifier = LexicalClassifier::new();
    let doc = long_document();
    let truncate = Settings::default();
    let mut chunked = Settings::default();
    chunked.text.strategy = TextStrategy::Chunked;

    c.bench_function("classify_truncated", |bench| {
        bench.iter(|| black_box(classify::classify_text(&classifier, &doc, &truncate).unwrap()))
    });
    c.bench_function("classify_chunked", |bench| {
        bench.iter(|| black_box(classify::classify_text(&classifier, &doc, &chunked).unwrap()))
    });
}

criterion_group!(benches, bench_lexical_score, bench_chunking, bench_classify_text);
criterion_main!(benches);
