use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "bilingual_stop";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _kind_field = schema_builder.add_text_field("kind", STRING | STORED);
    let _key_field = schema_builder.add_text_field("key", STRING | STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
    let _text_field = schema_builder.add_text_field("text", text_options);
    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    // English + French stopwords; questions arrive in either language.
    let stop_words = vec![
        "a","an","and","are","as","at","be","by","for","from","has","in","is","it","its","of","on",
        "that","the","to","was","will","with","or","but","not","this","these","they","what","which",
        "who","how","when","where","why","can","could","should","would","do","does","did","have","had",
        "le","la","les","un","une","des","du","de","d","l","et","ou","mais","dans","sur","pour","par",
        "avec","sans","est","sont","être","avoir","que","qui","quoi","quel","quelle","quels","quelles",
        "ce","cette","ces","se","sa","son","ses","au","aux","en","y","il","elle","ils","elles","nous",
        "vous","je","tu","ne","pas","plus","comment","pourquoi","quand",
    ];
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
