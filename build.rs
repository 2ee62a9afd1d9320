fn main() {
    tonic_build::configure()
        .build_server(false)
        .compile(&["proto/ledger_source.proto"], &["proto"])
        .expect("compiling proto/ledger_source.proto");
}
