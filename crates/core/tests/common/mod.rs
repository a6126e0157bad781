pub mod mock_assemblyai;
